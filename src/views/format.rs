//! Number and time formatting shared by every outbound message.

use chrono::DateTime;
use chrono_tz::Tz;

pub fn fmt2(x: f64) -> String {
    format!("{:.2}", x)
}

fn group_thousands(int_part: &str) -> String {
    let digits: Vec<char> = int_part.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

/// `1234.5` -> `"1,234.50"`.
pub fn fmt_money(x: f64) -> String {
    let s = format!("{:.2}", x.abs());
    let (int_part, frac) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let sign = if x < 0.0 && s != "0.00" { "-" } else { "" };
    format!("{sign}{}.{frac}", group_thousands(int_part))
}

/// `2500000.0` -> `"2,500,000"`.
pub fn fmt_volume(x: f64) -> String {
    let s = format!("{:.0}", x.abs());
    group_thousands(&s)
}

pub fn fmt_signed_percent(x: f64) -> String {
    if x >= 0.0 {
        format!("+{:.2}", x)
    } else {
        format!("{:.2}", x)
    }
}

pub fn fmt_signed_money(x: f64) -> String {
    if x >= 0.0 {
        format!("+${}", fmt_money(x))
    } else {
        format!("-${}", fmt_money(x.abs()))
    }
}

/// Green/red dot for the direction of a change.
pub fn indicator(change: f64) -> &'static str {
    if change >= 0.0 { "🟢" } else { "🔴" }
}

pub fn arrow(change: f64) -> &'static str {
    if change >= 0.0 { "📈" } else { "📉" }
}

/// Day-first local timestamp, e.g. `19.10.2026, 20:00:00`.
pub fn local_timestamp(now: &DateTime<Tz>) -> String {
    now.format("%-d.%-m.%Y, %H:%M:%S").to_string()
}
