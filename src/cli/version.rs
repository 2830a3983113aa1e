/// Display version information
pub fn execute() {
    println!("curator {}", env!("CARGO_PKG_VERSION"));
    println!("Moderated anonymous submissions for Telegram channels");
}
