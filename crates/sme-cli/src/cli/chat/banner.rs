//! Welcome banner shown when a chat session starts.

use console::style;

/// Print the welcome banner.
///
/// `resumed` carries the title and server id of a conversation picked up
/// with `--resume`.
pub fn print_welcome_banner(api_base_url: &str, source: Option<&str>, resumed: Option<(&str, &str)>) {
    println!();
    println!("  {} {}", style("?").cyan().bold(), style("SME Chat").cyan().bold());
    println!(
        "  {}",
        style("Answers grounded in your team's documentation and code").dim()
    );
    println!();
    println!("  {}  {}", style("Server:").bold(), style(api_base_url).dim());
    println!(
        "  {}  {}",
        style("Source:").bold(),
        style(source.unwrap_or("all")).dim()
    );
    if let Some((title, id)) = resumed {
        println!(
            "  {}  {} {}",
            style("Resumed:").bold(),
            title,
            style(format!("({})", short_id(id))).dim()
        );
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+C to stop an answer, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}

/// First eight characters of an id, for compact display.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0190a1b2-c3d4-7e5f"), "0190a1b2");
        assert_eq!(short_id("abc"), "abc");
    }
}
