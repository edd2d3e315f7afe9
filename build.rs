//! Stamps the build date, target and enabled backends into the `tmrt version` banner.

use std::env;

fn main() {
    let date = env::var("TMRT_BUILD_DATE").unwrap_or_else(|_| {
        time::format_description::parse("[year]-[month]-[day]")
            .ok()
            .and_then(|fmt| time::OffsetDateTime::now_utc().format(&fmt).ok())
            .unwrap_or_else(|| "unknown".to_string())
    });
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    // Cargo exposes enabled features as CARGO_FEATURE_<NAME>
    let backends: Vec<&str> = [("CARGO_FEATURE_GPU", "wgpu"), ("CARGO_FEATURE_CHROME_TRACE", "chrome-trace")]
        .into_iter()
        .filter(|(var, _)| env::var_os(var).is_some())
        .map(|(_, name)| name)
        .collect();
    let backends = if backends.is_empty() { "none".to_string() } else { backends.join(",") };

    println!("cargo:rustc-env=TMRT_BUILD_DATE={date}");
    println!("cargo:rustc-env=TMRT_BUILD_TARGET={target}");
    println!("cargo:rustc-env=TMRT_BUILD_FEATURES={backends}");
    println!("cargo:rerun-if-env-changed=TMRT_BUILD_DATE");
}
