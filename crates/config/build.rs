/// Env var that indicates to use the dev config
const SNB_DEV: &str = "SNB_DEV";

const CONFIG_FILE: &str = "settings.toml";
const DEV_CONFIG_FILE: &str = "settings-dev.toml";

fn main() -> anyhow::Result<()> {
    let config_file = get_config_file()?;

    println!("cargo::rerun-if-env-changed={SNB_DEV}");
    println!("cargo::rerun-if-changed={}", config_file.display());
    println!("cargo::rustc-env=DEFAULT_CONFIG_FILE={}", config_file.display());

    Ok(())
}

fn get_config_file() -> anyhow::Result<std::path::PathBuf> {
    let config_file = if std::env::var(SNB_DEV).is_ok() {
        DEV_CONFIG_FILE
    } else {
        CONFIG_FILE
    };

    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")?;
    let mut root_path = std::path::PathBuf::from(manifest_dir);

    // CARGO_MANIFEST_DIR is .../crates/config
    root_path.pop();
    root_path.pop();

    Ok(root_path.join("config").join(config_file))
}
