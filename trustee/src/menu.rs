//! Interactive settings menu shown before names are collected.

use std::io::{self, BufRead, Write};

use crate::config::{ClearMode, Settings};
use crate::reveal::RevealPolicy;
use crate::terminal::Console;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOutcome {
    Start,
    Abort,
}

pub fn run_menu<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    settings: &mut Settings,
) -> io::Result<MenuOutcome> {
    loop {
        render(console, settings)?;
        let Some(choice) = console.prompt("Choose 1-4 to change a setting, or press Enter to start: ")? else {
            return Ok(MenuOutcome::Abort);
        };

        match choice.as_str() {
            "" => return Ok(MenuOutcome::Start),
            "1" => {
                settings.policy = if settings.policy.allows_repeat() {
                    RevealPolicy::OneShot
                } else {
                    RevealPolicy::Repeatable
                };
            }
            "2" => {
                let Some(raw) = console.prompt("Seconds before auto-clear (blank = press Enter): ")? else {
                    return Ok(MenuOutcome::Abort);
                };
                if raw.is_empty() {
                    settings.clear = ClearMode::PressEnter;
                } else {
                    match raw.parse::<u64>() {
                        Ok(secs) => settings.clear = ClearMode::AfterSeconds(secs),
                        Err(_) => console.say("Please enter a whole number of seconds.")?,
                    }
                }
            }
            "3" => settings.backup = !settings.backup,
            "4" => {
                let Some(raw) = console.prompt("Seed (blank = random): ")? else {
                    return Ok(MenuOutcome::Abort);
                };
                if raw.is_empty() {
                    settings.seed = None;
                } else {
                    match raw.parse::<u64>() {
                        Ok(seed) => settings.seed = Some(seed),
                        Err(_) => console.say("Seeds are non-negative whole numbers.")?,
                    }
                }
            }
            other => console.say(format!("Unknown option {other:?}."))?,
        }
    }
}

fn render<R: BufRead, W: Write>(console: &mut Console<R, W>, settings: &Settings) -> io::Result<()> {
    let on_off = |flag: bool| if flag { "on" } else { "off" };
    let backup = if settings.backup {
        format!("on (archive in {})", settings.archive_dir.display())
    } else {
        "off".to_string()
    };
    let seed = settings
        .seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "random".to_string());

    console.say("")?;
    console.say("Settings")?;
    console.say(format!(
        "  1) One-shot reveal ...... {}",
        on_off(!settings.policy.allows_repeat())
    ))?;
    console.say(format!("  2) Clear after reveal ... {}", settings.clear.describe()))?;
    console.say(format!("  3) Encrypted backup ..... {backup}"))?;
    console.say(format!("  4) Seed ................. {seed}"))
}

#[cfg(test)]
mod tests {
    use super::{run_menu, MenuOutcome};
    use crate::config::{ClearMode, Settings};
    use crate::reveal::RevealPolicy;
    use crate::terminal::Console;
    use std::io::Cursor;

    fn drive(script: &str) -> (MenuOutcome, Settings, String) {
        let mut settings = Settings::default();
        let mut console = Console::new(Cursor::new(script.to_string()), Vec::new());
        let outcome = run_menu(&mut console, &mut settings).expect("in-memory io");
        let (_, output) = console.into_parts();
        (outcome, settings, String::from_utf8(output).unwrap())
    }

    #[test]
    fn enter_starts_with_defaults() {
        let (outcome, settings, output) = drive("\n");
        assert_eq!(outcome, MenuOutcome::Start);
        assert_eq!(settings, Settings::default());
        assert!(output.contains("One-shot reveal ...... on"));
    }

    #[test]
    fn toggles_and_values_apply() {
        let (outcome, settings, _) = drive("1\n2\n15\n3\n4\n42\n\n");
        assert_eq!(outcome, MenuOutcome::Start);
        assert_eq!(settings.policy, RevealPolicy::Repeatable);
        assert_eq!(settings.clear, ClearMode::AfterSeconds(15));
        assert!(!settings.backup);
        assert_eq!(settings.seed, Some(42));
    }

    #[test]
    fn bad_values_are_reported_and_ignored() {
        let (_, settings, output) = drive("2\nsoon\n4\n-3\n9\n\n");
        assert_eq!(settings.clear, ClearMode::PressEnter);
        assert_eq!(settings.seed, None);
        assert!(output.contains("whole number of seconds"));
        assert!(output.contains("Unknown option \"9\""));
    }

    #[test]
    fn end_of_input_aborts() {
        let (outcome, _, _) = drive("1\n");
        assert_eq!(outcome, MenuOutcome::Abort);
    }
}
