//! Build script for compile-time configuration injection.
//!
//! Both nodes must be built with the same values. Set environment variables
//! before building to override the defaults:
//!
//!   DOORLOCK_MAX_ATTEMPTS=3 \
//!   DOORLOCK_UNLOCK_SECS=15 \
//!   DOORLOCK_HOLD_OPEN_SECS=3 \
//!   DOORLOCK_ALARM_SECS=60 \
//!   DOORLOCK_MESSAGE_MS=3000 \
//!   DOORLOCK_KEY_REPEAT_MS=500 \
//!   DOORLOCK_BAUD=9600 \
//!   cargo build --release --features esp32

fn main() {
    // Re-run build script if these environment variables change
    println!("cargo::rerun-if-env-changed=DOORLOCK_MAX_ATTEMPTS");
    println!("cargo::rerun-if-env-changed=DOORLOCK_UNLOCK_SECS");
    println!("cargo::rerun-if-env-changed=DOORLOCK_HOLD_OPEN_SECS");
    println!("cargo::rerun-if-env-changed=DOORLOCK_ALARM_SECS");
    println!("cargo::rerun-if-env-changed=DOORLOCK_MESSAGE_MS");
    println!("cargo::rerun-if-env-changed=DOORLOCK_KEY_REPEAT_MS");
    println!("cargo::rerun-if-env-changed=DOORLOCK_BAUD");
}
