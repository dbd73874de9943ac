//! Host Facts
//!
//! Navigator-style facts about the machine the probe runs on: locale,
//! platform, parallelism, timezone and basic reachability.

use std::env;
use std::net::UdpSocket;
use std::path::Path;

use chrono::Local;

/// Address used to ask the routing table for a default route (no packet is sent)
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:53";

/// Default `zoneinfo` link target
const LOCALTIME_PATH: &str = "/etc/localtime";

/// Primary UI language in BCP 47 form (`es_ES.UTF-8` → `es-ES`)
///
/// Follows the POSIX precedence `LC_ALL` > `LC_MESSAGES` > `LANG`.
pub fn primary_language() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .filter_map(|key| env::var(key).ok())
        .find_map(|value| normalize_locale(&value))
}

/// Ordered language preferences from `LANGUAGE`, falling back to the primary one
pub fn preferred_languages(primary: Option<&str>) -> Vec<String> {
    let from_env: Vec<String> = env::var("LANGUAGE")
        .map(|list| list.split(':').filter_map(normalize_locale).collect())
        .unwrap_or_default();

    if !from_env.is_empty() {
        return from_env;
    }
    primary.map(|p| vec![p.to_string()]).unwrap_or_default()
}

/// Convert a POSIX locale name to a BCP 47 tag
///
/// Returns `None` for the `C`/`POSIX` locales and empty values.
pub fn normalize_locale(value: &str) -> Option<String> {
    let base = value
        .split(['.', '@'])
        .next()
        .unwrap_or_default()
        .trim();

    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

/// Platform label in the `navigator.platform` spirit, e.g. `Linux x86_64`
pub fn platform_name() -> String {
    let os = match env::consts::OS {
        "linux" => "Linux",
        "macos" => "MacOS",
        "windows" => "Win32",
        "freebsd" => "FreeBSD",
        other => other,
    };
    format!("{} {}", os, env::consts::ARCH)
}

/// Logical CPU count (at least 1)
pub fn hardware_concurrency() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Timezone offset in minutes with the JavaScript sign convention (UTC − local)
///
/// A host at UTC+2 reports `-120`.
pub fn timezone_offset_minutes() -> i32 {
    let local_minus_utc = Local::now().offset().local_minus_utc();
    -(local_minus_utc / 60)
}

/// IANA zone name from `TZ` or the `/etc/localtime` link
pub fn timezone_name() -> Option<String> {
    if let Ok(tz) = env::var("TZ") {
        let tz = tz.trim_start_matches(':').trim();
        if !tz.is_empty() {
            return Some(tz.to_string());
        }
    }

    let target = std::fs::read_link(LOCALTIME_PATH).ok()?;
    zone_from_localtime_target(&target)
}

/// Extract `Region/City` from a `.../zoneinfo/Region/City` link target
pub fn zone_from_localtime_target(target: &Path) -> Option<String> {
    let text = target.to_str()?;
    let (_, zone) = text.split_once("zoneinfo/")?;
    if zone.is_empty() {
        return None;
    }
    Some(zone.to_string())
}

/// Whether the routing table has a route to a public address
///
/// Connecting a UDP socket only selects a route; nothing leaves the host.
pub fn has_default_route() -> bool {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| socket.connect(ROUTE_PROBE_ADDR))
        .is_ok()
}
