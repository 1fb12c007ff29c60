//! ESP32 board glue shared by both node binaries: the one-second tick
//! interrupt, the blocking UART link, and flash offsets.

use core::cell::{Cell, RefCell};
use critical_section::Mutex;
use esp_hal::handler;
use esp_hal::interrupt::Priority;
use esp_hal::time::Duration;
use esp_hal::timer::PeriodicTimer;
use esp_hal::uart::Uart;
use esp_hal::Blocking;

use crate::link::{LinkError, SerialChannel};
use crate::tick::{ElapsedSeconds, TickSource};

// Credential slots, one 4KB flash sector each so that erasing one never
// touches the other. Placed in the reserved region after the app partition.
pub const CREDENTIAL_SLOT_A: u32 = 0x3D_0000;
pub const CREDENTIAL_SLOT_B: u32 = 0x3D_1000;

const TICK_PERIOD: Duration = Duration::from_secs(1);

// ISR-accessible state (single instance per node)
static TICK_TIMER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));
static TICK_COUNTER: Mutex<Cell<Option<&'static ElapsedSeconds>>> = Mutex::new(Cell::new(None));

/// Timer interrupt: acknowledge, then bump the counter. Nothing else.
#[handler(priority = Priority::Priority1)]
fn tick_handler() {
    let counter = critical_section::with(|cs| {
        if let Some(ref mut timer) = *TICK_TIMER.borrow_ref_mut(cs) {
            timer.clear_interrupt();
        }
        TICK_COUNTER.borrow(cs).get()
    });

    if let Some(counter) = counter {
        counter.tick();
    }
}

/// Hardware tick source on a timer-group periodic timer.
pub struct TimerTicks {
    // Held here while stopped, moved into `TICK_TIMER` while running
    idle_timer: Option<PeriodicTimer<'static, Blocking>>,
}

impl TimerTicks {
    pub fn new(mut timer: PeriodicTimer<'static, Blocking>) -> Self {
        timer.set_interrupt_handler(tick_handler);
        Self {
            idle_timer: Some(timer),
        }
    }
}

impl TickSource for TimerTicks {
    fn start(&mut self, counter: &'static ElapsedSeconds) {
        critical_section::with(|cs| TICK_COUNTER.borrow(cs).set(Some(counter)));

        let Some(mut timer) = self.idle_timer.take() else {
            log::warn!("tick: already running");
            return;
        };
        timer.enable_interrupt(true);
        if let Err(e) = timer.start(TICK_PERIOD) {
            log::error!("tick: timer start failed: {:?}", e);
        }
        critical_section::with(|cs| {
            TICK_TIMER.borrow_ref_mut(cs).replace(timer);
        });
        log::debug!("tick: started");
    }

    fn stop(&mut self) {
        let timer = critical_section::with(|cs| {
            TICK_COUNTER.borrow(cs).set(None);
            TICK_TIMER.borrow_ref_mut(cs).take()
        });
        if let Some(mut timer) = timer {
            timer.enable_interrupt(false);
            let _ = timer.stop();
            self.idle_timer = Some(timer);
        }
        log::debug!("tick: stopped");
    }
}

/// Blocking UART link to the other node.
pub struct UartChannel {
    uart: Uart<'static, Blocking>,
}

impl UartChannel {
    pub fn new(uart: Uart<'static, Blocking>) -> Self {
        Self { uart }
    }
}

impl SerialChannel for UartChannel {
    fn send(&mut self, byte: u8) -> Result<(), LinkError> {
        self.uart.write(&[byte]).map_err(|_| LinkError::Write)?;
        self.uart.flush().map_err(|_| LinkError::Write)
    }

    fn receive(&mut self) -> Result<u8, LinkError> {
        let mut buf = [0u8; 1];
        loop {
            match self.uart.read(&mut buf) {
                Ok(0) => core::hint::spin_loop(),
                Ok(_) => return Ok(buf[0]),
                // A framing or parity glitch drops one byte; the handshake
                // resynchronises on the next ready code.
                Err(e) => log::warn!("link: rx error {:?}", e),
            }
        }
    }
}

/// Park the core after an unrecoverable error.
pub fn halt() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
