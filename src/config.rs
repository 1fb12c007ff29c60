//! Lock timing and policy configuration, embedded at compile time.
//!
//! Both nodes read the same values so that their independently clocked
//! lockout windows and door timings line up. See `build.rs` for the
//! environment variables.

/// Number of digits in a credential. Both nodes must agree on it.
pub const PASS_LEN: usize = 5;

/// Timing and policy for one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Consecutive wrong credentials before lockout.
    pub max_attempts: u8,
    /// Duration of the engage and disengage motor phases.
    pub unlock_secs: u32,
    /// Time the door is left open between engage and disengage.
    pub hold_open_secs: u32,
    /// Length of the alarm/warning window after too many failures.
    pub alarm_secs: u32,
    /// How long error messages stay on screen.
    pub message_ms: u32,
    /// Pause after each accepted key press.
    pub key_repeat_ms: u32,
    pub baud_rate: u32,
}

impl Config {
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        unlock_secs: 15,
        hold_open_secs: 3,
        alarm_secs: 60,
        message_ms: 3000,
        key_repeat_ms: 500,
        baud_rate: 9600,
    };

    /// Get the compile-time configuration.
    pub fn get() -> Self {
        let d = Self::DEFAULT;
        Self {
            max_attempts: env_or(option_env!("DOORLOCK_MAX_ATTEMPTS"), d.max_attempts as u32)
                .min(u8::MAX as u32) as u8,
            unlock_secs: env_or(option_env!("DOORLOCK_UNLOCK_SECS"), d.unlock_secs),
            hold_open_secs: env_or(option_env!("DOORLOCK_HOLD_OPEN_SECS"), d.hold_open_secs),
            alarm_secs: env_or(option_env!("DOORLOCK_ALARM_SECS"), d.alarm_secs),
            message_ms: env_or(option_env!("DOORLOCK_MESSAGE_MS"), d.message_ms),
            key_repeat_ms: env_or(option_env!("DOORLOCK_KEY_REPEAT_MS"), d.key_repeat_ms),
            baud_rate: env_or(option_env!("DOORLOCK_BAUD"), d.baud_rate),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::get()
    }
}

const fn env_or(value: Option<&str>, default: u32) -> u32 {
    match value {
        Some(s) => parse_u32(s, default),
        None => default,
    }
}

/// Parse a decimal number at compile time (const fn compatible).
/// Non-digit characters are skipped; zero or overflow yields `default`.
pub const fn parse_u32(s: &str, default: u32) -> u32 {
    let bytes = s.as_bytes();
    let mut result: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if digit >= b'0' && digit <= b'9' {
            result = match result.checked_mul(10) {
                Some(r) => match r.checked_add((digit - b'0') as u32) {
                    Some(r) => r,
                    None => return default,
                },
                None => return default,
            };
        }
        i += 1;
    }
    if result == 0 { default } else { result }
}
