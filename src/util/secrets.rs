use crate::constants;
use std::sync::OnceLock; // thread-safe and can only be written to once

// global instance which will receive values from config file
pub static INSTANCE: OnceLock<Struct> = OnceLock::new();

// functions for convenience
pub fn lamp_host() -> String { INSTANCE.get().unwrap().lamp_host.clone() }
pub fn api_key() -> String { INSTANCE.get().unwrap().api_key.clone() }

#[derive(Debug, serde::Deserialize)]
pub struct Struct {
    /// base url of the lamp's http server, e.g. "http://192.168.0.42:8080"
    pub lamp_host: String,
    /// shared secret for the web api authorization
    pub api_key: String,
}

/// panics with error messages if valid `Struct` can't be retrieved
pub fn from_file() -> Struct {
    let mut path = dirs_next::config_dir()
        .expect("path to config file could not be determined, which means your operating system is not supported.\n");
    path.push(constants::CONFIG_FILE_NAME);

    // read file contents
    let yaml_config = std::fs::read_to_string(path.clone()).expect(format!(
        "config file could not be read from {}.\n\
        see the README for a template.\n", path.to_str().unwrap()
    ).as_str());

    // parse yaml string to struct
    return serde_yaml::from_str(&yaml_config).expect(format!(
        "config file at {} could not be parsed.\n\
        see the README for a template.\n", path.to_str().unwrap()
    ).as_str());
}
