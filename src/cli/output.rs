use crate::core::config::{AppState, ConfigDocument, ConfigField};

pub fn print_status(entries: &[(String, String)]) {
    println!("   AZenith Status   ");

    if entries.is_empty() {
        println!("No status values\n");
        return;
    }

    for (key, value) in entries {
        println!("  {:<14} {}", format!("{}:", key), value);
    }
    println!();
}

pub fn print_apps(doc: &ConfigDocument) {
    if doc.is_empty() {
        println!("No apps enabled");
        return;
    }
    println!("Enabled apps ({}):", doc.len());
    for package in doc.packages() {
        println!("  {}", package);
    }
}

pub fn print_app(package: &str, state: AppState<'_>) {
    match state {
        AppState::Disabled => println!("{}: disabled", package),
        AppState::Enabled(record) => {
            println!("{}: enabled", package);
            for field in ConfigField::ALL {
                println!("  {:<16} {}", field.name(), record.get(field));
            }
        }
    }
}

pub fn print_list(text: &str) {
    if text.is_empty() {
        println!("(empty)");
    } else {
        println!("{}", text);
    }
}

pub fn print_success(message: &str) {
    println!(" {}", message);
}
