use colored::Colorize;

fn prefix() -> String {
    "[pvenix]".bold().cyan().to_string()
}

/// Print an informational message: [pvenix] message
pub fn info(msg: &str) {
    println!("{} {}", prefix(), msg);
}

/// Print a success message: [pvenix] message (in green)
pub fn success(msg: &str) {
    println!("{} {}", prefix(), msg.green());
}

/// Print an error message: [pvenix] message (in red)
pub fn error(msg: &str) {
    eprintln!("{} {}", "[pvenix]".bold().red(), msg.red());
}
