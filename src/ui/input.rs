use crate::app::Message;
use crate::core::models::{EmailId, ProcessRequest};

/// Line commands accepted on stdin while watching.
pub const HELP: &str = "\
commands:
  i <id>        mark important
  a <id>        toggle archive
  r <id>        toggle read
  d <id>        delete
  refresh       re-fetch the email list
  reload        clear and reload everything
  reconnect     reopen the live channel
  spam <text>   test text against the spam filter
  process [categories] [count]
                run the email processor, e.g. `process primary,social 20`
  quit";

/// Parse one input line. `Err` carries a message for the user.
pub fn parse_command(line: &str) -> Result<Message, String> {
    let line = line.trim();
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    match cmd {
        "i" | "important" => Ok(Message::MarkImportant(parse_id(rest)?)),
        "a" | "archive" => Ok(Message::ToggleArchive(parse_id(rest)?)),
        "r" | "read" => Ok(Message::ToggleRead(parse_id(rest)?)),
        "d" | "delete" => Ok(Message::Delete(parse_id(rest)?)),
        "refresh" => Ok(Message::Refresh),
        "reload" => Ok(Message::Reload),
        "reconnect" => Ok(Message::Reconnect),
        "spam" => Ok(Message::TestSpam(rest.to_string())),
        "process" => parse_process(rest).map(Message::RunProcessor),
        "q" | "quit" | "exit" => Ok(Message::Teardown),
        "" => Ok(Message::Noop),
        other => Err(format!("Unknown command: {other}")),
    }
}

fn parse_id(arg: &str) -> Result<EmailId, String> {
    arg.parse()
        .map_err(|_| format!("Expected an email id, got {arg:?}"))
}

fn parse_process(args: &str) -> Result<ProcessRequest, String> {
    let mut request = ProcessRequest::default();
    for arg in args.split_whitespace() {
        if let Ok(n) = arg.parse::<u32>() {
            request.max_emails = n;
        } else {
            request.categories = arg
                .split(',')
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mutations() {
        assert!(matches!(parse_command("i 4"), Ok(Message::MarkImportant(4))));
        assert!(matches!(parse_command("  a 5 "), Ok(Message::ToggleArchive(5))));
        assert!(matches!(parse_command("read 6"), Ok(Message::ToggleRead(6))));
        assert!(matches!(parse_command("d 7"), Ok(Message::Delete(7))));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("d").is_err());
        assert!(parse_command("d seven").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn parses_control_commands() {
        assert!(matches!(parse_command("refresh"), Ok(Message::Refresh)));
        assert!(matches!(parse_command("reload"), Ok(Message::Reload)));
        assert!(matches!(parse_command("reconnect"), Ok(Message::Reconnect)));
        assert!(matches!(parse_command("quit"), Ok(Message::Teardown)));
        assert!(matches!(parse_command(""), Ok(Message::Noop)));
    }

    #[test]
    fn spam_keeps_full_text() {
        match parse_command("spam WIN  a FREE cruise") {
            Ok(Message::TestSpam(text)) => assert_eq!(text, "WIN  a FREE cruise"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn process_arguments() {
        match parse_command("process primary,social 20") {
            Ok(Message::RunProcessor(req)) => {
                assert_eq!(req.categories, vec!["primary", "social"]);
                assert_eq!(req.max_emails, 20);
            }
            other => panic!("unexpected {other:?}"),
        }
        match parse_command("process") {
            Ok(Message::RunProcessor(req)) => assert_eq!(req, ProcessRequest::default()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
