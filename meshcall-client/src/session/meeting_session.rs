use crate::channel::{RelayEvent, RendezvousChannel, WsRendezvous};
use crate::config::SessionConfig;
use crate::error::{NegotiationError, SessionError};
use crate::gesture::{GestureHub, GestureIntent};
use crate::media::{LocalStream, MediaDevices, RemoteStream};
use crate::peer::{MembershipReconciler, NegotiationEngine, PeerConnectionTable};
use crate::session::{
    CapturedMoment, ChatLog, LeaveReason, LocalMedia, Participant, REACTION_DISPLAY,
    SessionCommand, SessionHandle, SessionNotice, SessionView, Tile, TileKey, TileSource,
};
use crate::transport::{TransportEvent, TransportFactory};
use meshcall_core::utils::GUEST_NAME;
use meshcall_core::{
    ChatMessage, ConnectionState, IceServerConfig, MediaSource, ParticipantId, SignalEnvelope,
    TrackKind,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

/// Owns all state of one meeting and runs its event loop.
///
/// Three queues feed the loop: relay events, transport events and commands
/// from [`SessionHandle`]s (gesture intents included). Every negotiation
/// step is awaited in place, so signals from one peer are applied in relay
/// delivery order.
pub struct MeetingSession {
    local_id: ParticipantId,
    display_name: String,

    channel: Box<dyn RendezvousChannel>,
    relay_rx: mpsc::Receiver<RelayEvent>,

    table: PeerConnectionTable,
    engine: NegotiationEngine,
    reconciler: MembershipReconciler,
    factory: Arc<dyn TransportFactory>,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,

    command_rx: mpsc::Receiver<SessionCommand>,
    gestures: Option<GestureHub>,
    gesture_rx: Option<mpsc::Receiver<GestureIntent>>,

    devices: Arc<dyn MediaDevices>,
    media: LocalMedia,
    /// Resolves when the platform revokes the current screen share.
    screen_end: Option<oneshot::Receiver<()>>,

    participants: Vec<Participant>,
    /// Remote tiles in arrival order; the local tile is always first.
    remote_tiles: Vec<ParticipantId>,
    chat: ChatLog,
    recording: bool,
    moments: Vec<CapturedMoment>,

    view_tx: watch::Sender<SessionView>,
    notice_tx: mpsc::UnboundedSender<SessionNotice>,
}

impl MeetingSession {
    /// Connects to the relay and starts the session.
    pub async fn join(
        config: &SessionConfig,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn TransportFactory>,
    ) -> Result<(SessionHandle, mpsc::UnboundedReceiver<SessionNotice>), SessionError> {
        let (channel, relay_rx) = WsRendezvous::connect(
            &config.relay_url,
            &config.room,
            &config.display_name,
            config.connect_timeout(),
        )
        .await?;

        Ok(Self::start(config, Box::new(channel), relay_rx, devices, factory).await)
    }

    /// Starts the session over an already joined channel and spawns its loop.
    pub async fn start(
        config: &SessionConfig,
        channel: Box<dyn RendezvousChannel>,
        relay_rx: mpsc::Receiver<RelayEvent>,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn TransportFactory>,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionNotice>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();

        let session =
            Self::new(config, channel, relay_rx, command_rx, notice_tx, devices, factory).await;
        let handle = SessionHandle::new(
            session.local_id.clone(),
            command_tx,
            session.view_tx.subscribe(),
        );

        tokio::spawn(session.run());
        (handle, notice_rx)
    }

    async fn new(
        config: &SessionConfig,
        channel: Box<dyn RendezvousChannel>,
        relay_rx: mpsc::Receiver<RelayEvent>,
        command_rx: mpsc::Receiver<SessionCommand>,
        notice_tx: mpsc::UnboundedSender<SessionNotice>,
        devices: Arc<dyn MediaDevices>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        let local_id = channel.local_id().clone();
        let display_name = display_name_or_guest(&config.display_name);

        let (transport_tx, transport_rx) = mpsc::unbounded_channel();
        let table = PeerConnectionTable::new(factory.clone(), transport_tx);

        if !config.ice_servers.is_empty() {
            factory.update_ice_servers(config.ice_servers.clone()).await;
        }

        // Preview first; without it the participant only receives.
        let mut media = LocalMedia::new();
        match devices.acquire_camera().await {
            Ok(stream) => {
                media.replace_active(stream);
            }
            Err(e) => {
                warn!("Joining without local media: {}", e);
                let _ = notice_tx.send(SessionNotice::MediaUnavailable(e));
            }
        }

        let (gestures, gesture_rx) = if config.gestures.is_empty() {
            (None, None)
        } else {
            let (intent_tx, intent_rx) = mpsc::channel(32);
            let hub = GestureHub::spawn(&config.gestures, config.backoff, intent_tx);
            (Some(hub), Some(intent_rx))
        };

        let participants = vec![Participant {
            id: local_id.clone(),
            display_name: display_name.clone(),
            connection_state: ConnectionState::Connected,
            negotiation: None,
            is_local: true,
        }];

        let (view_tx, _) = watch::channel(SessionView {
            local_id: local_id.clone(),
            ..Default::default()
        });

        let session = Self {
            local_id,
            display_name,
            channel,
            relay_rx,
            table,
            engine: NegotiationEngine::new(),
            reconciler: MembershipReconciler::new(),
            factory,
            transport_rx,
            command_rx,
            gestures,
            gesture_rx,
            devices,
            media,
            screen_end: None,
            participants,
            remote_tiles: Vec::new(),
            chat: ChatLog::new(),
            recording: false,
            moments: Vec::new(),
            view_tx,
            notice_tx,
        };
        session.publish();
        session
    }

    /// Main loop. Ends on leave, on relay loss or when every handle is gone.
    async fn run(mut self) {
        info!(local_id = %self.local_id, "Meeting session started");

        let reason = loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(SessionCommand::Leave) | None => break LeaveReason::UserLeft,
                    Some(c) => self.handle_command(c).await,
                },

                evt = self.relay_rx.recv() => match evt {
                    Some(e) => self.handle_relay_event(e).await,
                    None => {
                        warn!("Relay connection lost");
                        break LeaveReason::RelayLost;
                    }
                },

                Some(evt) = self.transport_rx.recv() => self.handle_transport_event(evt).await,

                Some(intent) = next_intent(&mut self.gesture_rx) => self.handle_gesture(intent).await,

                revoked = screen_revoked(&mut self.screen_end) => {
                    if revoked {
                        info!("Screen share ended by the platform");
                        self.stop_screen_share().await;
                    }
                }
            }
        };

        self.teardown(reason).await;
        info!(local_id = %self.local_id, ?reason, "Meeting session finished");
    }

    async fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::IceConfig(servers) => {
                self.apply_ice_config(servers).await;
                return;
            }

            RelayEvent::RosterJoined {
                joined_id,
                members,
                names,
            } => {
                info!(%joined_id, members = members.len(), "Roster update");
                self.update_participants(&members, &names);

                let delta = self
                    .reconciler
                    .reconcile(&self.table, &self.local_id, &members);
                let tracks = self.media.tracks();
                let failures = self
                    .reconciler
                    .apply(&mut self.table, &delta, &tracks)
                    .await;
                for id in &delta.to_remove {
                    self.remote_tiles.retain(|t| t != id);
                }
                for failure in failures {
                    self.peer_failed(failure.peer().clone(), failure.to_string());
                }

                let errors = self
                    .engine
                    .initiate_offers(
                        &mut self.table,
                        self.channel.as_ref(),
                        &self.local_id,
                        &joined_id,
                        &members,
                    )
                    .await;
                for e in errors {
                    self.handle_negotiation_error(e).await;
                }
            }

            RelayEvent::MemberLeft(id) => {
                self.reconciler.forget(&id);
                let removed = self.table.remove(&id).await;
                let known = self.participants.iter().any(|p| p.id == id);
                if !removed && !known {
                    debug!(peer = %id, "Departure of an unknown participant");
                    return;
                }
                info!(peer = %id, "Participant left");
                self.participants.retain(|p| p.id != id);
                self.remote_tiles.retain(|t| t != &id);
            }

            RelayEvent::Signal { from, envelope } => {
                if let Err(e) = self
                    .engine
                    .handle_signal(&mut self.table, self.channel.as_ref(), &from, envelope)
                    .await
                {
                    // Only a configuration failure changes what is shown
                    let removes_peer = matches!(e, NegotiationError::Configuration(_));
                    self.handle_negotiation_error(e).await;
                    if !removes_peer {
                        return;
                    }
                }
            }

            RelayEvent::SignalRejected { from, reason } => {
                let e = NegotiationError::MalformedPayload { from, reason };
                warn!("Dropping signal: {}", e);
                return;
            }

            RelayEvent::ChatReceived {
                sender_id,
                sender_name,
                body,
            } => {
                let message = ChatMessage {
                    sender_name: display_name_or_guest(&sender_name),
                    sender_id,
                    body,
                };
                if !self.chat.receive(message, &self.local_id) {
                    return;
                }
            }
        }

        self.publish();
    }

    async fn apply_ice_config(&mut self, servers: Vec<IceServerConfig>) {
        debug!(count = servers.len(), "ICE configuration from relay");
        self.factory.update_ice_servers(servers).await;
    }

    /// Transport events from a removed or replaced entry are dropped here.
    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let (peer, generation) = event.origin();
        if !self.table.is_current(peer, generation) {
            debug!(%peer, generation, "Dropping event from a closed transport");
            return;
        }

        match event {
            TransportEvent::CandidateGenerated {
                peer, candidate, ..
            } => {
                let envelope = SignalEnvelope::Ice(candidate);
                if let Err(e) = self.channel.send_signal(&peer, &envelope).await {
                    warn!(%peer, "Failed to send ICE candidate: {}", e);
                }
                return;
            }

            TransportEvent::TrackReceived { peer, track, .. } => {
                let Some(entry) = self.table.get_mut(&peer) else {
                    return;
                };
                match &mut entry.remote_stream {
                    Some(stream) => {
                        stream.add_track(track);
                    }
                    None => entry.remote_stream = Some(RemoteStream::new(track)),
                }
                if !self.remote_tiles.contains(&peer) {
                    info!(%peer, "Remote media arrived");
                    self.remote_tiles.push(peer);
                }
            }

            TransportEvent::StateChanged { peer, state, .. } => {
                if let Some(entry) = self.table.get_mut(&peer) {
                    entry.connection_state = state;
                }
                if state == ConnectionState::Failed {
                    self.peer_failed(peer, "connection failed".to_owned());
                }
            }
        }

        self.publish();
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::ToggleVideo => self.toggle(TrackKind::Video),
            SessionCommand::ToggleAudio => self.toggle(TrackKind::Audio),
            SessionCommand::ToggleScreenShare => {
                if self.media.state().active_source == MediaSource::Screen {
                    self.stop_screen_share().await;
                } else {
                    self.start_screen_share().await;
                }
            }
            SessionCommand::SendChat(body) => self.send_chat(body).await,
            SessionCommand::MarkChatSeen => self.chat.mark_seen(),
            SessionCommand::Gesture(intent) => self.handle_gesture(intent).await,
            SessionCommand::PublishFrame(image) => {
                if let Some(hub) = &self.gestures {
                    hub.publish_frame(&image);
                }
                return;
            }
            // Handled by the loop itself
            SessionCommand::Leave => return,
        }

        self.publish();
    }

    fn toggle(&mut self, kind: TrackKind) {
        if !self.media.is_ready() {
            debug!(?kind, "Ignoring toggle without local media");
            return;
        }
        let enabled = self.media.toggle(kind);
        info!(?kind, enabled, "Local track toggled");
    }

    async fn handle_gesture(&mut self, intent: GestureIntent) {
        if !self.media.is_ready() {
            debug!(?intent, "Ignoring gesture before local media is ready");
            return;
        }
        debug!(?intent, "Gesture intent");

        match intent {
            GestureIntent::SetMicrophoneEnabled(enabled) => {
                self.media.set_enabled(TrackKind::Audio, enabled);
            }
            GestureIntent::ReactionTriggered => self.notify(SessionNotice::ReactionShown {
                duration: REACTION_DISPLAY,
            }),
            GestureIntent::CaptureRequested => self.notify(SessionNotice::ScreenshotRequested),
            GestureIntent::RecordingStartRequested => {
                if !self.recording {
                    self.recording = true;
                    self.notify(SessionNotice::RecordingStarted);
                }
            }
            GestureIntent::RecordingStopRequested => {
                if self.recording {
                    self.recording = false;
                    self.notify(SessionNotice::RecordingStopped);
                }
            }
            GestureIntent::MomentDetected => self.notify(SessionNotice::CaptionRequested),
            GestureIntent::MomentCaptured(caption) => {
                let caption = caption.trim();
                if !caption.is_empty() {
                    self.moments.push(CapturedMoment {
                        captured_at: SystemTime::now(),
                        caption: caption.to_owned(),
                    });
                }
            }
        }

        self.publish();
    }

    async fn send_chat(&mut self, body: String) {
        if body.trim().is_empty() {
            return;
        }
        if let Err(e) = self.channel.send_chat(&body, &self.display_name).await {
            warn!("Failed to send chat message: {}", e);
            return;
        }
        self.chat.push_local(ChatMessage {
            sender_name: self.display_name.clone(),
            sender_id: self.local_id.clone(),
            body,
        });
    }

    async fn start_screen_share(&mut self) {
        if !self.media.is_ready() {
            debug!("Ignoring screen share without local media");
            return;
        }
        match self.devices.acquire_screen().await {
            Ok(capture) => {
                info!("Screen share started");
                self.swap_source(capture.stream).await;
                self.screen_end = Some(capture.ended);
            }
            Err(e) => {
                warn!("Screen share unavailable: {}", e);
                self.notify(SessionNotice::MediaUnavailable(e));
            }
        }
    }

    /// Falls back to camera and microphone.
    async fn stop_screen_share(&mut self) {
        self.screen_end = None;
        match self.devices.acquire_camera().await {
            Ok(stream) => self.swap_source(stream).await,
            Err(e) => {
                warn!("Camera unavailable after screen share: {}", e);
                for track in self.media.clear() {
                    track.stop();
                }
                self.notify(SessionNotice::MediaUnavailable(e));
            }
        }
        self.publish();
    }

    /// Replaces the preview and the outgoing tracks of every peer. Peer
    /// entries stay as they are; kinds the new source lacks keep sending.
    async fn swap_source(&mut self, stream: LocalStream) {
        let incoming = stream.tracks().to_vec();
        let retired = self.media.replace_active(stream);
        for track in &incoming {
            for (peer, e) in self.table.replace_track_all(track).await {
                warn!(%peer, kind = ?track.kind(), "Failed to replace outgoing track: {}", e);
            }
        }
        for track in retired {
            track.stop();
        }
    }

    async fn handle_negotiation_error(&mut self, e: NegotiationError) {
        match e {
            NegotiationError::Configuration(e) => {
                let peer = e.peer().clone();
                error!(%peer, "Removing peer after configuration failure: {}", e);
                self.table.remove(&peer).await;
                self.reconciler.mark_failed(&peer);
                self.remote_tiles.retain(|t| t != &peer);
                self.peer_failed(peer, e.to_string());
            }
            other => warn!("Dropping signal: {}", other),
        }
    }

    fn peer_failed(&mut self, peer: ParticipantId, reason: String) {
        if let Some(p) = self.participants.iter_mut().find(|p| p.id == peer) {
            p.connection_state = ConnectionState::Failed;
        }
        self.notify(SessionNotice::PeerFailed { peer, reason });
    }

    /// Adopts the roster: every member gets a participant entry with its
    /// name, departed ones are dropped.
    fn update_participants(
        &mut self,
        members: &[ParticipantId],
        names: &HashMap<ParticipantId, String>,
    ) {
        self.participants
            .retain(|p| p.is_local || members.contains(&p.id));

        for member in members.iter().filter(|m| **m != self.local_id) {
            let name = names.get(member).map(|n| display_name_or_guest(n));
            match self.participants.iter_mut().find(|p| &p.id == member) {
                Some(existing) => {
                    if let Some(name) = name {
                        existing.display_name = name;
                    }
                }
                None => self.participants.push(Participant {
                    id: member.clone(),
                    display_name: name.unwrap_or_else(|| GUEST_NAME.to_owned()),
                    connection_state: ConnectionState::New,
                    negotiation: None,
                    is_local: false,
                }),
            }
        }
    }

    async fn teardown(&mut self, reason: LeaveReason) {
        info!(?reason, peers = self.table.len(), "Leaving meeting");

        if let Some(mut hub) = self.gestures.take() {
            hub.shutdown();
        }
        self.table.close_all().await;
        if let Err(e) = self.channel.leave().await {
            debug!("Relay leave failed: {}", e);
        }
        self.media.stop();
        self.screen_end = None;

        self.remote_tiles.clear();
        self.participants.retain(|p| p.is_local);
        self.publish_with(|view| view.ended = true);
        self.notify(SessionNotice::Left(reason));
    }

    fn notify(&self, notice: SessionNotice) {
        let _ = self.notice_tx.send(notice);
    }

    fn publish(&self) {
        self.publish_with(|_| {});
    }

    fn publish_with(&self, finish: impl FnOnce(&mut SessionView)) {
        let mut view = self.build_view();
        finish(&mut view);
        self.view_tx.send_replace(view);
    }

    fn build_view(&self) -> SessionView {
        let local_source = match self.media.active() {
            Some(stream) => TileSource::Preview(stream.source()),
            None => TileSource::NoPreview,
        };
        let mut tiles = vec![Tile {
            key: TileKey::Local,
            name: self.display_name.clone(),
            source: local_source,
        }];

        for id in &self.remote_tiles {
            let Some(stream) = self.table.get(id).and_then(|e| e.remote_stream()) else {
                continue;
            };
            tiles.push(Tile {
                key: TileKey::Remote(id.clone()),
                name: self.name_of(id),
                source: TileSource::Remote {
                    stream_id: stream.id.clone(),
                    audio: stream.has(TrackKind::Audio),
                    video: stream.has(TrackKind::Video),
                },
            });
        }

        let participants = self
            .participants
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if let Some(entry) = self.table.get(&p.id) {
                    p.negotiation = Some(entry.negotiation());
                    if p.connection_state != ConnectionState::Failed {
                        p.connection_state = entry.connection_state();
                    }
                }
                p
            })
            .collect();

        SessionView {
            local_id: self.local_id.clone(),
            tiles,
            participants,
            messages: self.chat.messages().to_vec(),
            unseen_messages: self.chat.unseen(),
            media: self.media.state(),
            media_ready: self.media.is_ready(),
            recording: self.recording,
            moments: self.moments.clone(),
            ended: false,
        }
    }

    fn name_of(&self, id: &ParticipantId) -> String {
        self.participants
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.display_name.clone())
            .unwrap_or_else(|| GUEST_NAME.to_owned())
    }
}

fn display_name_or_guest(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() {
        GUEST_NAME.to_owned()
    } else {
        name.to_owned()
    }
}

async fn next_intent(rx: &mut Option<mpsc::Receiver<GestureIntent>>) -> Option<GestureIntent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves with `true` when the capture was revoked. A capture whose
/// revoke signal can never fire stops being watched.
async fn screen_revoked(ended: &mut Option<oneshot::Receiver<()>>) -> bool {
    let Some(rx) = ended else {
        return std::future::pending().await;
    };
    let revoked = rx.await.is_ok();
    *ended = None;
    revoked
}
