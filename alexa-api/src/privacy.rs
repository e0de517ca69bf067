//! Redaction helpers for log output
//!
//! Account emails and device serials end up in nearly every log line of the
//! state core. These helpers keep enough of each value to correlate lines
//! without writing the full identifier.

/// Obfuscate an email, keeping the first character and the domain
///
/// `someone@example.com` becomes `s******@example.com`.
pub fn hide_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let mut chars = local.chars();
            match chars.next() {
                Some(first) => format!("{}{}@{}", first, "*".repeat(chars.count()), domain),
                None => format!("@{}", domain),
            }
        }
        None => "*".repeat(email.chars().count()),
    }
}

/// Obfuscate a serial number, keeping the last three characters
pub fn hide_serial(serial: &str) -> String {
    let len = serial.chars().count();
    if len <= 3 {
        return serial.to_string();
    }
    let tail: String = serial.chars().skip(len - 3).collect();
    format!("{}{}", "*".repeat(len - 3), tail)
}
