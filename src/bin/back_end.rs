//! Back-end (control) node firmware: credential flash, door motor H-bridge,
//! buzzer, UART to the front-end.

#![no_std]
#![no_main]

use esp_bootloader_esp_idf::esp_app_desc;
esp_app_desc!();

use esp_hal::{
    clock::CpuClock,
    gpio::{Level, Output, OutputConfig},
    main,
    timer::{timg::TimerGroup, PeriodicTimer},
    uart::{Config as UartConfig, Uart},
};
use esp_println::logger::init_logger;
use esp_storage::FlashStorage;

use door_lock::actuator::{Buzzer, HBridge};
use door_lock::back_end::BackEnd;
use door_lock::board::{self, TimerTicks, UartChannel, CREDENTIAL_SLOT_A, CREDENTIAL_SLOT_B};
use door_lock::storage::CredentialStore;
use door_lock::tick::{ElapsedSeconds, Stopwatch};
use door_lock::Config;

static ELAPSED: ElapsedSeconds = ElapsedSeconds::new();

#[main]
fn main() -> ! {
    init_logger(log::LevelFilter::Info);
    log::info!("Door lock back-end starting...");

    let config = Config::get();
    log::info!("config: {:?}", config);

    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    // One-second tick on TIMG0
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let clock = Stopwatch::start(&ELAPSED, TimerTicks::new(PeriodicTimer::new(timg0.timer0)));

    // UART1 to the front-end (GPIO16=RX, GPIO17=TX)
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

    let store = CredentialStore::new(
        FlashStorage::new(),
        CREDENTIAL_SLOT_A,
        CREDENTIAL_SLOT_B,
    );

    // Door motor H-bridge (GPIO25=IN1, GPIO26=IN2), buzzer (GPIO27)
    let motor = HBridge::new(
        Output::new(peripherals.GPIO25, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO26, Level::Low, OutputConfig::default()),
    );
    let buzzer = Buzzer::new(Output::new(
        peripherals.GPIO27,
        Level::Low,
        OutputConfig::default(),
    ));

    let mut node = BackEnd::new(UartChannel::new(uart), store, motor, buzzer, clock, config);

    match node.run() {
        Ok(never) => match never {},
        Err(e) => log::error!("back-end stopped: {}", e),
    }
    board::halt();
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("PANIC: {}", info);
    esp_hal::system::software_reset()
}
