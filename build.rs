use std::process::Command;

/// Прокидывает в сборку короткий хэш коммита и время сборки; их печатает
/// `streamhub-bench` в заголовке отчёта.
fn main() {
    let commit = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=STREAMHUB_GIT_COMMIT={commit}");
    println!(
        "cargo:rustc-env=STREAMHUB_BUILD_TIME={}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ")
    );
    println!("cargo:rerun-if-changed=.git/HEAD");
}
