//! Console rendering
//!
//! ANSI-colored status lines and boxes. Each bridge step prints a dim `>`
//! line when it starts and a green check when it completes, so long waits
//! (receipt polling, the challenge window) leave a visible trail.

use alloy::primitives::Address;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

/// Startup banner with the active wallet.
pub fn banner(address: Address) {
    boxed(
        &[
            format!("{BOLD}Portal Bridge CLI{RESET}"),
            format!("Wallet: {address}"),
        ],
        CYAN,
        false,
    );
}

/// Labelled horizontal rule between menu rounds.
pub fn hr(label: Option<&str>) {
    match label {
        Some(label) => println!("{DIM}{} {} {}{RESET}", "─".repeat(30), label, "─".repeat(30)),
        None => println!("{DIM}{}{RESET}", "─".repeat(62)),
    }
}

/// A step that is starting.
pub fn step(message: &str) {
    println!("{DIM}> {message}...{RESET}");
}

/// A step that completed.
pub fn ok(message: &str) {
    println!("{GREEN}✓{RESET} {message}");
}

/// An informational pointer (predicted hashes and the like).
pub fn note(message: &str) {
    println!("{YELLOW}↗{RESET} {message}");
}

/// A failure.
pub fn fail(message: &str) {
    eprintln!("{RED}✗ {message}{RESET}");
}

/// A reminder the user should act on (e.g. keep a hash around).
pub fn reminder(message: &str) {
    boxed(&[message.to_string()], YELLOW, false);
}

/// Closing box for a completed flow.
pub fn success_box(message: &str) {
    boxed(&[format!("{BOLD}{message}{RESET}")], GREEN, true);
}

/// Draw lines inside a box. Width follows the longest line; ANSI escapes
/// are excluded from the width calculation.
fn boxed(lines: &[String], color: &str, double: bool) {
    let width = lines
        .iter()
        .map(|line| visible_len(line))
        .max()
        .unwrap_or(0);

    let (top_left, top_right, bottom_left, bottom_right, horizontal, vertical) = if double {
        ("╔", "╗", "╚", "╝", "═", "║")
    } else {
        ("╭", "╮", "╰", "╯", "─", "│")
    };

    let bar = horizontal.repeat(width + 2);
    println!("{color}{top_left}{bar}{top_right}{RESET}");
    for line in lines {
        let padding = " ".repeat(width - visible_len(line));
        println!("{color}{vertical}{RESET} {line}{padding} {color}{vertical}{RESET}");
    }
    println!("{color}{bottom_left}{bar}{bottom_right}{RESET}");
}

/// Character count ignoring ANSI escape sequences.
fn visible_len(line: &str) -> usize {
    let mut len = 0;
    let mut in_escape = false;
    for c in line.chars() {
        if in_escape {
            if c == 'm' {
                in_escape = false;
            }
        } else if c == '\x1b' {
            in_escape = true;
        } else {
            len += 1;
        }
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_len_ignores_escapes() {
        assert_eq!(visible_len("plain"), 5);
        assert_eq!(visible_len(&format!("{GREEN}ok{RESET}")), 2);
        assert_eq!(visible_len(""), 0);
    }
}
