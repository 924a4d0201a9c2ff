use colored::*;
use meshcall_client::SessionNotice;
use meshcall_client::SessionView;
use meshcall_core::{ConnectionState, LocalMediaState, ParticipantId};
use std::collections::HashMap;

/// Prints what changed between two published views.
#[derive(Default)]
pub struct ViewPrinter {
    roster: HashMap<ParticipantId, (String, ConnectionState)>,
    printed_messages: usize,
    media: Option<LocalMediaState>,
    moments: usize,
}

impl ViewPrinter {
    /// Returns the number of unseen messages in `view`.
    pub fn print(&mut self, view: &SessionView) -> usize {
        for p in view.participants.iter().filter(|p| !p.is_local) {
            let current = (p.display_name.clone(), p.connection_state);
            match self.roster.insert(p.id.clone(), current.clone()) {
                None => println!("{} {} ({})", "➕".green(), p.display_name.bold(), p.id),
                Some(previous) if previous.1 != current.1 => {
                    let state = format!("{:?}", current.1).to_lowercase();
                    let state = match current.1 {
                        ConnectionState::Connected => state.green(),
                        ConnectionState::Failed => state.red(),
                        _ => state.dimmed(),
                    };
                    println!("   {} is {}", p.display_name, state);
                }
                Some(_) => {}
            }
        }
        self.roster.retain(|id, (name, _)| {
            let present = view.participant(id).is_some();
            if !present {
                println!("{} {} left", "➖".yellow(), name.bold());
            }
            present
        });

        // A shorter log means a fresh session; print it again
        if view.messages.len() < self.printed_messages {
            self.printed_messages = 0;
        }
        for msg in &view.messages[self.printed_messages..] {
            if msg.sender_id == view.local_id {
                continue;
            }
            println!("{} {}", format!("[{}]", msg.sender_name).blue().bold(), msg.body);
        }
        self.printed_messages = view.messages.len();

        if self.media != Some(view.media) && view.media_ready {
            println!(
                "🎥 {:?} video {} audio {}",
                view.media.active_source,
                on_off(view.media.video_enabled),
                on_off(view.media.audio_enabled)
            );
        }
        self.media = Some(view.media);

        for moment in view.moments.iter().skip(self.moments) {
            println!("📌 Moment saved: {}", moment.caption.italic());
        }
        self.moments = view.moments.len();

        view.unseen_messages
    }
}

fn on_off(enabled: bool) -> ColoredString {
    if enabled { "on".green() } else { "off".red() }
}

pub fn print_notice(notice: &SessionNotice) {
    match notice {
        SessionNotice::ReactionShown { duration } => {
            println!("🎉 Reaction ({}s)", duration.as_secs());
        }
        SessionNotice::ScreenshotRequested => println!("📸 Screenshot requested"),
        SessionNotice::RecordingStarted => println!("{}", "⏺  Recording started".red()),
        SessionNotice::RecordingStopped => println!("⏹  Recording stopped"),
        SessionNotice::CaptionRequested => {
            println!("{}", "✍  Moment detected, caption it with /caption <text>".cyan());
        }
        SessionNotice::MediaUnavailable(e) => {
            println!("{}", format!("⚠️  Media unavailable: {e}").yellow());
        }
        SessionNotice::PeerFailed { peer, reason } => {
            println!("{}", format!("❌ Connection to {peer} failed: {reason}").red());
        }
        SessionNotice::Left(reason) => println!("👋 Left: {reason:?}"),
    }
}
