use std::sync::Arc;

use anyhow::Result;
use session_sync::client::SessionSyncApi;
use session_sync::contract::model::SessionState;
use tokio::io::{AsyncBufReadExt, BufReader};
use workflow_webhook::WorkflowWebhook;

use crate::commands::{self, Command, HELP};

pub enum Flow {
    Continue,
    Quit,
}

/// Interactive operator shell over the session API and the webhook trigger.
pub struct Console {
    session: Arc<dyn SessionSyncApi>,
    webhook: WorkflowWebhook,
}

impl Console {
    pub fn new(session: Arc<dyn SessionSyncApi>, webhook: WorkflowWebhook) -> Self {
        Self { session, webhook }
    }

    /// Read commands from stdin until `quit`, EOF or a shutdown signal.
    pub async fn run(&self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut state_rx = self.session.watch();
        let mut last_summary = summary(&state_rx.borrow_and_update());

        let shutdown = runtime::shutdown::wait_for_shutdown();
        tokio::pin!(shutdown);

        println!("{HELP}");
        println!("[session] {last_summary}");

        loop {
            tokio::select! {
                res = &mut shutdown => {
                    res?;
                    break;
                }
                changed = state_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = summary(&state_rx.borrow_and_update());
                    if current != last_summary {
                        println!("[session] {current}");
                        last_summary = current;
                    }
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match commands::parse(&line) {
                        Ok(None) => {}
                        Ok(Some(cmd)) => {
                            if let Flow::Quit = self.execute(cmd).await {
                                break;
                            }
                        }
                        Err(e) => println!("error: {e:#}"),
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn execute(&self, cmd: Command) -> Flow {
        let outcome = match cmd {
            Command::Status => Ok(render_state(&self.session.state())),
            Command::Login { email } => self
                .session
                .sign_in_with_email(&email)
                .await
                .map(|_| format!("sign-in email sent to {email}; run 'verify {email} <code>'")),
            Command::Verify { email, code } => self
                .session
                .verify_email_otp(&email, &code)
                .await
                .map(|_| "code accepted".to_string()),
            Command::Anon => self
                .session
                .sign_in_anonymously()
                .await
                .map(|_| "anonymous sign-in requested".to_string()),
            Command::Logout => self
                .session
                .sign_out()
                .await
                .map(|_| "signed out".to_string()),
            Command::Set { patch } => {
                if !self.session.state().is_signed_in() {
                    return print_flow("not signed in; nothing to update".to_string());
                }
                self.session
                    .update_profile(patch)
                    .await
                    .map(|_| "profile saved".to_string())
            }
            Command::Trigger { workflow, payload } => {
                return match self.webhook.trigger(&workflow, &payload).await {
                    Ok(body) => print_flow(format!("{workflow}: {body}")),
                    Err(e) => print_flow(format!("error: {e}")),
                };
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Quit => return Flow::Quit,
        };

        match outcome {
            Ok(message) => print_flow(message),
            Err(e) => print_flow(format!("error: {e}")),
        }
    }
}

fn print_flow(message: String) -> Flow {
    println!("{message}");
    Flow::Continue
}

/// One-line state description used for change notifications.
pub fn summary(state: &SessionState) -> String {
    if state.loading {
        return "loading...".to_string();
    }
    match (&state.user, &state.profile) {
        (None, _) => "signed out".to_string(),
        (Some(user), profile) => {
            let kind = if user.is_anonymous { "anonymous" } else { "email" };
            let name = profile
                .as_ref()
                .map(|p| p.display_name())
                .unwrap_or("...");
            format!("signed in as {name} ({kind}, id {})", user.id)
        }
    }
}

/// Multi-line view for the `status` command.
pub fn render_state(state: &SessionState) -> String {
    let mut out = summary(state);
    if let Some(profile) = state.profile.as_ref().filter(|_| !state.loading) {
        let rows = [
            ("initials", Some(profile.initials())),
            ("name", profile.name.clone()),
            ("email", profile.email.clone()),
            ("company", profile.company_name.clone()),
            ("avatar", profile.avatar_url.clone()),
            ("job", profile.job_title.clone()),
        ];
        for (label, value) in rows {
            out.push_str(&format!(
                "\n  {label:<9}{}",
                value.as_deref().unwrap_or("-")
            ));
        }
    }
    if let Some(expires) = state.session.as_ref().and_then(|s| s.expires_at) {
        out.push_str(&format!("\n  expires  {}", expires.to_rfc3339()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use session_sync::contract::model::{Profile, User};

    fn signed_in(profile: Option<Profile>) -> SessionState {
        let mut state = SessionState::initial();
        state.loading = false;
        state.user = Some(User {
            id: "u1".into(),
            email: Some("a@b.com".into()),
            is_anonymous: false,
        });
        state.profile = profile;
        state
    }

    #[test]
    fn summary_covers_lifecycle() {
        assert_eq!(summary(&SessionState::initial()), "loading...");

        let mut signed_out = SessionState::initial();
        signed_out.loading = false;
        assert_eq!(summary(&signed_out), "signed out");

        assert_eq!(
            summary(&signed_in(None)),
            "signed in as ... (email, id u1)"
        );
        let profile = Profile {
            name: Some("Alex Sterling".into()),
            ..Profile::default()
        };
        assert_eq!(
            summary(&signed_in(Some(profile))),
            "signed in as Alex Sterling (email, id u1)"
        );
    }

    #[test]
    fn status_lists_profile_fields() {
        let profile = Profile {
            name: Some("Alex Sterling".into()),
            email: Some("a@b.com".into()),
            job_title: Some("Growth Lead".into()),
            ..Profile::default()
        };
        let text = render_state(&signed_in(Some(profile)));
        assert!(text.contains("initials AS"));
        assert!(text.contains("job      Growth Lead"));
        assert!(text.contains("company  -"));
    }
}
