// Terminal UI utilities
// Shared by the command layer; keep pipeline logic out of here.

use colored::Colorize;

const HEADER_WIDTH: usize = 60;

pub fn print_header(title: &str) {
    let inner = HEADER_WIDTH.max(title.len() + 4);
    println!();
    println!("{}", format!("╔{}╗", "═".repeat(inner)).bright_blue());
    println!(
        "{}",
        format!("║  {:<width$}║", title, width = inner - 2).bright_blue()
    );
    println!("{}", format!("╚{}╝", "═".repeat(inner)).bright_blue());
    println!();
}

pub fn print_step(current: usize, total: usize, label: &str) {
    println!(
        "{}",
        format!("━━━ Step {}/{}: {} ━━━", current, total, label).bright_blue()
    );
}

pub fn print_success(message: &str) {
    println!("{}", format!("✅ {}", message).bright_green().bold());
}

pub fn print_error(message: &str) {
    eprintln!("{}", format!("❌ {}", message).bright_red().bold());
}

pub fn print_warning(message: &str) {
    println!("{}", format!("⚠️  {}", message).bright_yellow());
}

pub fn print_kv(key: &str, value: &str) {
    println!("  {:<28} {}", format!("{}:", key).bold(), value);
}
