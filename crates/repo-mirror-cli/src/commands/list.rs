use crate::commands::format;
use crate::config::AppConfig;

pub fn run(config: &AppConfig) {
    if config.mirrors.is_empty() {
        println!("No mirrors configured.");
        return;
    }

    for entry in &config.mirrors {
        println!("{}", format::mirror_line(entry));
    }
}
