//! Front-end (HMI) node firmware: 4x4 keypad, 16x2 LCD, UART to the
//! back-end.

#![no_std]
#![no_main]

use esp_bootloader_esp_idf::esp_app_desc;
esp_app_desc!();

use esp_hal::{
    clock::CpuClock,
    delay::Delay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    main,
    timer::{timg::TimerGroup, PeriodicTimer},
    uart::{Config as UartConfig, Uart},
};
use esp_println::logger::init_logger;

use door_lock::board::{self, TimerTicks, UartChannel};
use door_lock::front_end::FrontEnd;
use door_lock::keypad::MatrixKeypad;
use door_lock::lcd::Hd44780;
use door_lock::tick::{ElapsedSeconds, Stopwatch};
use door_lock::Config;

static ELAPSED: ElapsedSeconds = ElapsedSeconds::new();

#[main]
fn main() -> ! {
    init_logger(log::LevelFilter::Info);
    log::info!("Door lock front-end starting...");

    let config = Config::get();
    log::info!("config: {:?}", config);

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    // One-second tick on TIMG0
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let clock = Stopwatch::start(&ELAPSED, TimerTicks::new(PeriodicTimer::new(timg0.timer0)));

    // UART1 to the back-end (GPIO16=RX, GPIO17=TX)
    let uart = match Uart::new(
        peripherals.UART1,
        UartConfig::default().with_baudrate(config.baud_rate),
    ) {
        Ok(uart) => uart.with_rx(peripherals.GPIO16).with_tx(peripherals.GPIO17),
        Err(e) => {
            log::error!("UART init failed: {:?}", e);
            board::halt();
        }
    };

    // LCD in 4-bit mode (GPIO19=RS, GPIO18=E, GPIO21/22/23/5=D4..D7)
    let lcd = Hd44780::new(
        Output::new(peripherals.GPIO19, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO18, Level::Low, OutputConfig::default()),
        [
            Output::new(peripherals.GPIO21, Level::Low, OutputConfig::default()),
            Output::new(peripherals.GPIO22, Level::Low, OutputConfig::default()),
            Output::new(peripherals.GPIO23, Level::Low, OutputConfig::default()),
            Output::new(peripherals.GPIO5, Level::Low, OutputConfig::default()),
        ],
        Delay::new(),
    );

    // Keypad rows driven (GPIO32/33/25/26), columns pulled up (GPIO27/14/4/13)
    let keypad = MatrixKeypad::new(
        [
            Output::new(peripherals.GPIO32, Level::High, OutputConfig::default()),
            Output::new(peripherals.GPIO33, Level::High, OutputConfig::default()),
            Output::new(peripherals.GPIO25, Level::High, OutputConfig::default()),
            Output::new(peripherals.GPIO26, Level::High, OutputConfig::default()),
        ],
        [
            Input::new(peripherals.GPIO27, InputConfig::default().with_pull(Pull::Up)),
            Input::new(peripherals.GPIO14, InputConfig::default().with_pull(Pull::Up)),
            Input::new(peripherals.GPIO4, InputConfig::default().with_pull(Pull::Up)),
            Input::new(peripherals.GPIO13, InputConfig::default().with_pull(Pull::Up)),
        ],
        Delay::new(),
    );

    let mut node = FrontEnd::new(UartChannel::new(uart), keypad, lcd, Delay::new(), clock, config);

    match node.run() {
        Ok(never) => match never {},
        Err(e) => log::error!("front-end stopped: {}", e),
    }
    board::halt();
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("PANIC: {}", info);
    esp_hal::system::software_reset()
}
