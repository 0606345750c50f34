//! Power-mode controller — the hexagonal core.
//!
//! [`PowerModeController`] owns the current mode, the link state, the
//! activity byte counter, and the deadline generation. It exposes a clean,
//! hardware-agnostic API. All I/O flows through port traits injected at
//! call sites, making the entire controller testable with mock adapters.
//!
//! ```text
//!  GATT / SPP / button / timer events ──▶ ┌──────────────────────┐
//!                                         │ PowerModeController  │──▶ EventSink
//!  RadioPort · TransportPort ◀────────────│ mode · link · bytes  │
//!  DeadlinePort ◀─────────────────────────└──────────────────────┘
//! ```
//!
//! Every operation is a short, non-blocking state transition plus a
//! bounded number of directive calls. The caller (the main event loop)
//! serialises all operations, so the fields here have exactly one writer
//! and no operation ever observes another mid-flight.

use log::{debug, info};

use crate::config::SystemConfig;
use crate::power::{entry_effects, AdvPreset, ConnPreset, Directive, LinkState, Mode, TxContext};

use super::commands::ControlCommand;
use super::events::AppEvent;
use super::ports::{DeadlinePort, EventSink, RadioPort, TransportPort};

// ───────────────────────────────────────────────────────────────
// PowerModeController
// ───────────────────────────────────────────────────────────────

/// The controller orchestrating the power/throughput trade-off.
pub struct PowerModeController {
    mode: Mode,
    link: LinkState,
    /// Bytes of qualifying traffic observed in the current sampling window.
    activity_bytes: u32,
    /// Generation of the currently-armed inactivity deadline. An expiry
    /// carrying an older generation raced a restart and is discarded.
    deadline_gen: u32,
    config: SystemConfig,
}

impl PowerModeController {
    /// Construct the controller. Does **not** issue any directives —
    /// call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            mode: Mode::Idle,
            link: LinkState::Disconnected,
            activity_bytes: 0,
            deadline_gen: 0,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Apply the Idle entry effects (minimum power, slow advertising) and
    /// open the first sampling window. The inactivity deadline stays
    /// unarmed until traffic or a connection arrives.
    pub fn start(
        &mut self,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        for d in entry_effects(Mode::Idle, self.link, &self.config) {
            self.issue(d, io);
        }
        io.restart_window();
        sink.emit(&AppEvent::Started(self.mode));
        info!("controller started in {}", self.mode.name());
    }

    // ── Mode transitions ──────────────────────────────────────

    /// Switch to `target`, issuing its entry effects. Re-entering the
    /// current mode is a no-op: no directives, no events.
    pub fn request_mode(
        &mut self,
        target: Mode,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        if target == self.mode {
            return;
        }
        let from = self.mode;
        self.mode = target;
        for d in entry_effects(target, self.link, &self.config) {
            self.issue(d, io);
        }
        sink.emit(&AppEvent::ModeChanged { from, to: target });
        info!("mode: {} -> {}", from.name(), target.name());
    }

    // ── Link events ───────────────────────────────────────────

    /// A central connected. A fresh connection always starts in Probe so
    /// its traffic volume can be assessed, and always begins with
    /// power-saving connection parameters until the heuristic (or an
    /// explicit boost) says otherwise.
    pub fn on_connect(
        &mut self,
        conn_id: u16,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        self.link = LinkState::Connected(conn_id);
        sink.emit(&AppEvent::LinkUp { conn_id });
        self.request_mode(Mode::Probe, io, sink);
        io.request_conn_params(conn_id, ConnPreset::PowerSave);
        self.activity_bytes = 0;
        io.restart_window();
        self.restart_deadline(io);
    }

    /// The central disconnected. Tear the bulk transport down, drop to
    /// Idle, and restart slow advertising explicitly — the entry effect
    /// alone would be skipped if the mode was already Idle.
    pub fn on_disconnect(
        &mut self,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        self.link = LinkState::Disconnected;
        sink.emit(&AppEvent::LinkDown);
        io.stop();
        self.request_mode(Mode::Idle, io, sink);
        io.start_advertising(AdvPreset::Slow);
    }

    // ── Traffic ───────────────────────────────────────────────

    /// Qualifying inbound payload on either the attribute-write path or
    /// the bulk-transport receive path. Side effect only: feeds the
    /// heuristic and pushes the inactivity deadline out, never changes
    /// the mode by itself.
    pub fn on_qualifying_traffic(&mut self, byte_len: usize, io: &mut impl DeadlinePort) {
        self.activity_bytes = self.activity_bytes.saturating_add(byte_len as u32);
        self.restart_deadline(io);
    }

    // ── Commands ──────────────────────────────────────────────

    /// Explicit boost command from the control characteristic. BoostOn is
    /// the *only* path that starts the bulk transport.
    pub fn on_control_command(
        &mut self,
        cmd: ControlCommand,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        match cmd {
            ControlCommand::BoostOn => {
                self.request_mode(Mode::Active, io, sink);
                io.start();
                sink.emit(&AppEvent::BoostChanged { enabled: true });
            }
            ControlCommand::BoostOff => {
                io.stop();
                sink.emit(&AppEvent::BoostChanged { enabled: false });
                self.request_mode(Mode::Probe, io, sink);
            }
        }
        self.restart_deadline(io);
    }

    /// Manual trigger (button press): wake into discoverability. Probe
    /// entry gates advertising on "not connected", so a press during a
    /// live connection does not disturb the link.
    pub fn on_manual_trigger(
        &mut self,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        self.request_mode(Mode::Probe, io, sink);
    }

    // ── Timer callbacks ───────────────────────────────────────

    /// The inactivity deadline fired. This is the only unconditional
    /// demotion path — the safety net against anything pinning the device
    /// in Active without reporting bytes. A stale generation means a
    /// traffic event restarted the deadline while this expiry was in
    /// flight, and the expiry is void.
    pub fn on_inactivity_expired(
        &mut self,
        generation: u32,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        if generation != self.deadline_gen {
            debug!(
                "inactivity expiry generation {} stale (current {})",
                generation, self.deadline_gen
            );
            return;
        }
        info!("inactivity timeout -> power-save");
        if let Some(id) = self.link.conn_id() {
            io.request_conn_params(id, ConnPreset::PowerSave);
            io.set_tx_power(TxContext::Advertising, self.config.tx_power_low_dbm);
            io.set_tx_power(TxContext::Connection, self.config.tx_power_low_dbm);
        }
        sink.emit(&AppEvent::InactivityDemotion);
        self.request_mode(Mode::Idle, io, sink);
    }

    /// The sampling window closed. Read-and-reset the byte counter and
    /// apply the heuristic: enough volume promotes to Active; otherwise
    /// fall back to Probe (connected) or Idle (disconnected). The bulk
    /// transport is never touched here.
    pub fn on_window_elapsed(
        &mut self,
        io: &mut (impl RadioPort + TransportPort + DeadlinePort),
        sink: &mut impl EventSink,
    ) {
        let bytes = core::mem::take(&mut self.activity_bytes);
        let promoted = bytes >= self.config.activity_bytes_threshold;
        sink.emit(&AppEvent::WindowSampled { bytes, promoted });

        if promoted {
            info!("activity threshold crossed ({} bytes) -> Active", bytes);
            self.request_mode(Mode::Active, io, sink);
        } else if let Some(id) = self.link.conn_id() {
            io.request_conn_params(id, ConnPreset::PowerSave);
            io.set_tx_power(TxContext::Advertising, self.config.tx_power_low_dbm);
            io.set_tx_power(TxContext::Connection, self.config.tx_power_low_dbm);
            self.request_mode(Mode::Probe, io, sink);
        } else {
            self.request_mode(Mode::Idle, io, sink);
        }

        io.restart_window();
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current link state.
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Bytes accumulated in the open sampling window.
    pub fn activity_bytes(&self) -> u32 {
        self.activity_bytes
    }

    /// Generation the next inactivity expiry must carry to be honoured.
    pub fn deadline_gen(&self) -> u32 {
        self.deadline_gen
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> SystemConfig {
        self.config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    /// Translate one entry-effect directive into port calls.
    fn issue(&self, directive: Directive, io: &mut (impl RadioPort + TransportPort)) {
        match directive {
            Directive::SetTxPower { context, dbm } => io.set_tx_power(context, dbm),
            Directive::StartAdvertising(preset) => io.start_advertising(preset),
            Directive::RequestConnParams { conn_id, preset } => {
                io.request_conn_params(conn_id, preset);
            }
            Directive::StopBulkTransport => io.stop(),
        }
    }

    fn restart_deadline(&mut self, io: &mut impl DeadlinePort) {
        self.deadline_gen = self.deadline_gen.wrapping_add(1);
        io.restart_inactivity(self.deadline_gen);
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        TxPower(TxContext, i8),
        Advertise(AdvPreset),
        ConnParams(u16, ConnPreset),
        TransportStart,
        TransportStop,
        RestartInactivity(u32),
        RestartWindow,
    }

    #[derive(Default)]
    struct MockIo {
        calls: Vec<Call>,
        transport_running: bool,
    }

    impl RadioPort for MockIo {
        fn set_tx_power(&mut self, context: TxContext, dbm: i8) {
            self.calls.push(Call::TxPower(context, dbm));
        }
        fn start_advertising(&mut self, preset: AdvPreset) {
            self.calls.push(Call::Advertise(preset));
        }
        fn request_conn_params(&mut self, conn_id: u16, preset: ConnPreset) {
            self.calls.push(Call::ConnParams(conn_id, preset));
        }
    }

    impl TransportPort for MockIo {
        fn start(&mut self) {
            self.transport_running = true;
            self.calls.push(Call::TransportStart);
        }
        fn stop(&mut self) {
            self.transport_running = false;
            self.calls.push(Call::TransportStop);
        }
        fn is_running(&self) -> bool {
            self.transport_running
        }
    }

    impl DeadlinePort for MockIo {
        fn restart_inactivity(&mut self, generation: u32) {
            self.calls.push(Call::RestartInactivity(generation));
        }
        fn restart_window(&mut self) {
            self.calls.push(Call::RestartWindow);
        }
    }

    #[derive(Default)]
    struct VecSink {
        events: Vec<AppEvent>,
    }

    impl EventSink for VecSink {
        fn emit(&mut self, event: &AppEvent) {
            self.events.push(*event);
        }
    }

    fn started() -> (PowerModeController, MockIo, VecSink) {
        let mut ctrl = PowerModeController::new(SystemConfig::default());
        let mut io = MockIo::default();
        let mut sink = VecSink::default();
        ctrl.start(&mut io, &mut sink);
        io.calls.clear();
        sink.events.clear();
        (ctrl, io, sink)
    }

    #[test]
    fn start_enters_idle_with_slow_advertising() {
        let mut ctrl = PowerModeController::new(SystemConfig::default());
        let mut io = MockIo::default();
        let mut sink = VecSink::default();
        ctrl.start(&mut io, &mut sink);

        assert_eq!(ctrl.mode(), Mode::Idle);
        assert!(io.calls.contains(&Call::Advertise(AdvPreset::Slow)));
        assert!(io.calls.contains(&Call::RestartWindow));
        assert!(
            !io.calls.iter().any(|c| matches!(c, Call::RestartInactivity(_))),
            "deadline must stay unarmed until traffic or a connection"
        );
        assert_eq!(sink.events, vec![AppEvent::Started(Mode::Idle)]);
    }

    #[test]
    fn request_mode_is_idempotent() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.request_mode(Mode::Idle, &mut io, &mut sink);
        assert!(io.calls.is_empty(), "re-entering the current mode must issue nothing");
        assert!(sink.events.is_empty());
    }

    #[test]
    fn connect_starts_probe_with_power_save_params() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(42, &mut io, &mut sink);

        assert_eq!(ctrl.mode(), Mode::Probe);
        assert_eq!(ctrl.link(), LinkState::Connected(42));
        // Probe entry while connected: low power, no advertising.
        assert_eq!(io.calls[0], Call::TxPower(TxContext::Advertising, -24));
        assert_eq!(io.calls[1], Call::TxPower(TxContext::Connection, -24));
        assert!(!io.calls.iter().any(|c| matches!(c, Call::Advertise(_))));
        // Loosened parameters, fresh window, armed deadline.
        assert!(io.calls.contains(&Call::ConnParams(42, ConnPreset::PowerSave)));
        assert!(io.calls.contains(&Call::RestartWindow));
        assert_eq!(*io.calls.last().unwrap(), Call::RestartInactivity(1));
        assert_eq!(ctrl.activity_bytes(), 0);
    }

    #[test]
    fn connect_from_active_still_drops_to_probe() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.request_mode(Mode::Active, &mut io, &mut sink);
        ctrl.on_connect(7, &mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Probe);
    }

    #[test]
    fn disconnect_always_stops_transport_and_readvertises() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(5, &mut io, &mut sink);
        ctrl.on_control_command(ControlCommand::BoostOn, &mut io, &mut sink);
        assert!(io.transport_running);
        io.calls.clear();

        ctrl.on_disconnect(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Idle);
        assert_eq!(ctrl.link(), LinkState::Disconnected);
        assert!(!io.transport_running);
        assert_eq!(
            *io.calls.last().unwrap(),
            Call::Advertise(AdvPreset::Slow),
            "slow advertising must be reissued explicitly"
        );
    }

    #[test]
    fn disconnect_while_idle_still_readvertises() {
        // Mode is already Idle so the entry effect is skipped; the
        // explicit restart is what guarantees advertising resumes.
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_disconnect(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Idle);
        assert!(io.calls.contains(&Call::Advertise(AdvPreset::Slow)));
    }

    #[test]
    fn traffic_accumulates_and_restarts_deadline() {
        let (mut ctrl, mut io, _sink) = started();
        ctrl.on_qualifying_traffic(100, &mut io);
        ctrl.on_qualifying_traffic(28, &mut io);
        assert_eq!(ctrl.activity_bytes(), 128);
        assert_eq!(
            io.calls,
            vec![Call::RestartInactivity(1), Call::RestartInactivity(2)]
        );
    }

    #[test]
    fn traffic_alone_never_changes_mode() {
        let (mut ctrl, mut io, _sink) = started();
        ctrl.on_qualifying_traffic(10_000, &mut io);
        assert_eq!(ctrl.mode(), Mode::Idle);
    }

    #[test]
    fn boost_on_promotes_then_starts_transport() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(9, &mut io, &mut sink);
        io.calls.clear();
        sink.events.clear();

        ctrl.on_control_command(ControlCommand::BoostOn, &mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Active);
        assert!(io.transport_running);

        // Active entry (max power + tightened params) before transport start.
        let start_pos = io.calls.iter().position(|c| *c == Call::TransportStart).unwrap();
        let power_pos = io
            .calls
            .iter()
            .position(|c| *c == Call::TxPower(TxContext::Connection, 9))
            .unwrap();
        assert!(power_pos < start_pos);
        assert!(io.calls.contains(&Call::ConnParams(9, ConnPreset::LowLatency)));
        assert!(sink.events.contains(&AppEvent::BoostChanged { enabled: true }));
    }

    #[test]
    fn boost_off_stops_transport_then_drops_to_probe() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(9, &mut io, &mut sink);
        ctrl.on_control_command(ControlCommand::BoostOn, &mut io, &mut sink);
        io.calls.clear();

        ctrl.on_control_command(ControlCommand::BoostOff, &mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Probe);
        assert!(!io.transport_running);
        let stop_pos = io.calls.iter().position(|c| *c == Call::TransportStop).unwrap();
        let probe_pos = io
            .calls
            .iter()
            .position(|c| *c == Call::TxPower(TxContext::Advertising, -24))
            .unwrap();
        assert!(stop_pos < probe_pos, "transport stops before Probe entry effects");
    }

    #[test]
    fn boost_commands_restart_the_deadline() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_control_command(ControlCommand::BoostOn, &mut io, &mut sink);
        assert!(io.calls.contains(&Call::RestartInactivity(1)));
        ctrl.on_control_command(ControlCommand::BoostOff, &mut io, &mut sink);
        assert!(io.calls.contains(&Call::RestartInactivity(2)));
    }

    #[test]
    fn manual_trigger_enters_probe_with_fast_advertising() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_manual_trigger(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Probe);
        assert_eq!(*io.calls.last().unwrap(), Call::Advertise(AdvPreset::Fast));
    }

    #[test]
    fn manual_trigger_while_connected_does_not_advertise() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(3, &mut io, &mut sink);
        ctrl.on_control_command(ControlCommand::BoostOn, &mut io, &mut sink);
        io.calls.clear();

        ctrl.on_manual_trigger(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Probe);
        assert!(!io.calls.iter().any(|c| matches!(c, Call::Advertise(_))));
    }

    #[test]
    fn window_promotes_at_threshold() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(4, &mut io, &mut sink);
        ctrl.on_qualifying_traffic(128, &mut io);
        ctrl.on_qualifying_traffic(128, &mut io);
        io.calls.clear();
        sink.events.clear();

        ctrl.on_window_elapsed(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Active);
        assert_eq!(ctrl.activity_bytes(), 0, "counter must be reset at the window boundary");
        assert!(sink.events.contains(&AppEvent::WindowSampled { bytes: 256, promoted: true }));
        assert_eq!(*io.calls.last().unwrap(), Call::RestartWindow);
    }

    #[test]
    fn window_below_threshold_connected_falls_back_to_probe() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(4, &mut io, &mut sink);
        ctrl.request_mode(Mode::Active, &mut io, &mut sink);
        ctrl.on_qualifying_traffic(50, &mut io);
        io.calls.clear();

        ctrl.on_window_elapsed(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Probe);
        assert!(io.calls.contains(&Call::ConnParams(4, ConnPreset::PowerSave)));
        assert!(io.calls.contains(&Call::TxPower(TxContext::Connection, -24)));
    }

    #[test]
    fn window_below_threshold_disconnected_falls_back_to_idle() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.request_mode(Mode::Probe, &mut io, &mut sink);
        io.calls.clear();

        ctrl.on_window_elapsed(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Idle);
        assert!(
            !io.calls.iter().any(|c| matches!(c, Call::ConnParams(..))),
            "no conn-param request without a connection"
        );
    }

    #[test]
    fn promotion_never_starts_the_transport() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(4, &mut io, &mut sink);
        ctrl.on_qualifying_traffic(300, &mut io);
        ctrl.on_window_elapsed(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Active);
        assert!(
            !io.transport_running,
            "heuristic promotion affects radio parameters only, not the transport gate"
        );
    }

    #[test]
    fn empty_window_after_promotion_demotes_again() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(4, &mut io, &mut sink);
        ctrl.on_qualifying_traffic(512, &mut io);
        ctrl.on_window_elapsed(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Active);

        ctrl.on_window_elapsed(&mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Probe);
    }

    #[test]
    fn inactivity_expiry_forces_idle_with_power_save_request_first() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(8, &mut io, &mut sink);
        ctrl.on_control_command(ControlCommand::BoostOn, &mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Active);
        let generation = ctrl.deadline_gen();
        io.calls.clear();
        sink.events.clear();

        ctrl.on_inactivity_expired(generation, &mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Idle);
        assert!(!io.transport_running, "Idle entry tears the transport down");

        let save_pos = io
            .calls
            .iter()
            .position(|c| *c == Call::ConnParams(8, ConnPreset::PowerSave))
            .unwrap();
        let stop_pos = io.calls.iter().position(|c| *c == Call::TransportStop).unwrap();
        assert!(save_pos < stop_pos, "power-save request precedes the Idle transition");
        assert!(sink.events.contains(&AppEvent::InactivityDemotion));
    }

    #[test]
    fn inactivity_expiry_while_disconnected_goes_idle_quietly() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.request_mode(Mode::Probe, &mut io, &mut sink);
        ctrl.on_qualifying_traffic(1, &mut io);
        io.calls.clear();

        ctrl.on_inactivity_expired(ctrl.deadline_gen(), &mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Idle);
        assert!(!io.calls.iter().any(|c| matches!(c, Call::ConnParams(..))));
    }

    #[test]
    fn stale_inactivity_expiry_is_discarded() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(2, &mut io, &mut sink);
        ctrl.on_control_command(ControlCommand::BoostOn, &mut io, &mut sink);
        let stale_gen = ctrl.deadline_gen();

        // Traffic arrives "at the instant of expiry" and restarts the
        // deadline before the expiry event is processed.
        ctrl.on_qualifying_traffic(64, &mut io);
        io.calls.clear();
        sink.events.clear();

        ctrl.on_inactivity_expired(stale_gen, &mut io, &mut sink);
        assert_eq!(ctrl.mode(), Mode::Active, "stale expiry must not demote");
        assert!(io.calls.is_empty());
        assert!(sink.events.is_empty());
    }

    #[test]
    fn window_counter_sums_exactly() {
        let (mut ctrl, mut io, mut sink) = started();
        ctrl.on_connect(1, &mut io, &mut sink);
        for len in [3usize, 17, 250, 0, 9] {
            ctrl.on_qualifying_traffic(len, &mut io);
        }
        assert_eq!(ctrl.activity_bytes(), 279);
        sink.events.clear();
        ctrl.on_window_elapsed(&mut io, &mut sink);
        assert!(sink.events.contains(&AppEvent::WindowSampled { bytes: 279, promoted: true }));
        assert_eq!(ctrl.activity_bytes(), 0);
    }
}
