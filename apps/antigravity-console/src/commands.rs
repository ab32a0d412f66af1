use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use session_sync::contract::model::ProfilePatch;

pub const HELP: &str = "\
commands:
  status                       show the current session and profile
  login <email>                send a sign-in email
  verify <email> <code>        complete sign-in with the emailed code
  anon                         sign in anonymously
  logout                       sign out
  set <field> <value>          update a profile field (name, email, company, avatar, job)
  trigger <workflow> [json]    POST a JSON payload to a workflow webhook
  help                         show this text
  quit                         exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Login { email: String },
    Verify { email: String, code: String },
    Anon,
    Logout,
    Set { patch: ProfilePatch },
    Trigger { workflow: String, payload: Value },
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "status" => Command::Status,
        "login" => Command::Login {
            email: single_arg(rest, "login <email>")?,
        },
        "verify" => {
            let mut args = rest.split_whitespace();
            match (args.next(), args.next(), args.next()) {
                (Some(email), Some(code), None) => Command::Verify {
                    email: email.to_string(),
                    code: code.to_string(),
                },
                _ => bail!("usage: verify <email> <code>"),
            }
        }
        "anon" => Command::Anon,
        "logout" => Command::Logout,
        "set" => Command::Set {
            patch: parse_set(rest)?,
        },
        "trigger" => {
            let (workflow, json) = match rest.split_once(char::is_whitespace) {
                Some((workflow, json)) => (workflow, json.trim()),
                None => (rest, ""),
            };
            if workflow.is_empty() {
                bail!("usage: trigger <workflow> [json]");
            }
            let payload = if json.is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(json).context("payload is not valid JSON")?
            };
            Command::Trigger {
                workflow: workflow.to_string(),
                payload,
            }
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}' (try 'help')"),
    };
    Ok(Some(cmd))
}

fn single_arg(rest: &str, usage: &str) -> Result<String> {
    let mut args = rest.split_whitespace();
    match (args.next(), args.next()) {
        (Some(arg), None) => Ok(arg.to_string()),
        _ => Err(anyhow!("usage: {usage}")),
    }
}

fn parse_set(rest: &str) -> Result<ProfilePatch> {
    let Some((field, value)) = rest.split_once(char::is_whitespace) else {
        bail!("usage: set <field> <value>");
    };
    let value = Some(value.trim().to_string());
    let mut patch = ProfilePatch::default();
    match field.to_ascii_lowercase().as_str() {
        "name" => patch.name = value,
        "email" => patch.email = value,
        "company" | "company_name" => patch.company_name = value,
        "avatar" | "avatar_url" => patch.avatar_url = value,
        "job" | "job_title" => patch.job_title = value,
        other => bail!("unknown profile field '{other}'"),
    }
    Ok(patch)
}
