//! Command-line argument handling
//!
//! Kept apart from `main.rs` so parsing can be tested without a runtime.

use crate::services::share_link::parse_share_link;

pub const USAGE: &str = "usage:
  watch-service <channel-id|share-link> [first-name last-name email]
  watch-service broadcast <email> <password>
  watch-service logout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationArgs {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a viewer session, optionally registering straight away
    Watch {
        identifier: String,
        registration: Option<RegistrationArgs>,
    },
    /// Sign in and go live until interrupted
    Broadcast { email: String, password: String },
    /// Drop the persisted broadcaster session
    Logout,
}

/// Parse arguments (without the binary name). `None` means print usage.
pub fn parse_args<I>(args: I) -> Option<Command>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();

    match args.first().map(String::as_str) {
        None | Some("-h") | Some("--help") | Some("help") => None,
        Some("logout") if args.len() == 1 => Some(Command::Logout),
        Some("broadcast") => match &args[1..] {
            [email, password] => Some(Command::Broadcast {
                email: email.clone(),
                password: password.clone(),
            }),
            _ => None,
        },
        Some(target) => {
            // Share links and bare identifiers are both accepted
            let identifier = parse_share_link(target).unwrap_or(target).to_string();
            let registration = match &args[1..] {
                [] => None,
                [first_name, last_name, email] => Some(RegistrationArgs {
                    first_name: first_name.clone(),
                    last_name: last_name.clone(),
                    email: email.clone(),
                }),
                _ => return None,
            };
            Some(Command::Watch {
                identifier,
                registration,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_watch_with_share_link() {
        let command = parse_args(args(&[
            "http://localhost:5173/watch/550e8400-e29b-41d4-a716-446655440000",
        ]));
        assert_eq!(
            command,
            Some(Command::Watch {
                identifier: "550e8400-e29b-41d4-a716-446655440000".into(),
                registration: None,
            })
        );
    }

    #[test]
    fn test_watch_with_registration() {
        let command = parse_args(args(&["not-a-uuid", "Ada", "Lovelace", "a@b.c"])).unwrap();
        match command {
            Command::Watch {
                identifier,
                registration: Some(registration),
            } => {
                assert_eq!(identifier, "not-a-uuid");
                assert_eq!(registration.email, "a@b.c");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_incomplete_registration_is_usage_error() {
        assert_eq!(parse_args(args(&["id", "Ada"])), None);
    }

    #[test]
    fn test_broadcast_and_logout() {
        assert_eq!(
            parse_args(args(&["broadcast", "a@b.c", "pw"])),
            Some(Command::Broadcast {
                email: "a@b.c".into(),
                password: "pw".into()
            })
        );
        assert_eq!(parse_args(args(&["broadcast", "a@b.c"])), None);
        assert_eq!(parse_args(args(&["logout"])), Some(Command::Logout));
        assert_eq!(parse_args(Vec::new()), None);
        assert_eq!(parse_args(args(&["--help"])), None);
    }
}
