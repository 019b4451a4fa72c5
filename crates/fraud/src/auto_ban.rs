use rbp_core::UserId;
use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionType {
    ChipDumping,
    BotDetection,
    AnomalyDetection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// External sink for an applied ban. The core never owns ban storage or
/// enforcement — it only decides *when* to call out.
pub trait BanService: Send + Sync {
    fn apply_temporary_ban(&self, user_id: UserId, reason: &str, duration: Duration);
}

/// Admin/Telegram notification sink. Failing to notify never blocks or
/// fails the detection pipeline — it's best-effort.
pub trait Notifier: Send + Sync {
    fn notify_admins(&self, user_id: UserId, reasons: &[String], severity: Severity);
}

pub struct LoggingNotifier;
impl Notifier for LoggingNotifier {
    fn notify_admins(&self, user_id: UserId, reasons: &[String], severity: Severity) {
        log::info!("admin notification: user={user_id} severity={severity:?} reasons={reasons:?}");
    }
}

/// Durable record of every suspicious-activity flag, independent of the
/// in-memory threshold bookkeeping used to decide bans. Best-effort like
/// [`Notifier`] — a write failure never blocks the detection pipeline.
pub trait AuditLogger: Send + Sync {
    fn record(&self, user_id: UserId, detection_type: DetectionType, severity: Severity, reasons: &[String], banned: bool);
}

pub struct LoggingAuditLogger;
impl AuditLogger for LoggingAuditLogger {
    fn record(&self, user_id: UserId, detection_type: DetectionType, severity: Severity, reasons: &[String], banned: bool) {
        log::info!("[audit] user={user_id} detection={detection_type:?} severity={severity:?} banned={banned} reasons={reasons:?}");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AutoBanConfig {
    pub enabled: bool,
    pub high_severity_immediate: bool,
    pub temp_ban_duration: Duration,
    pub detection_window: Duration,
    pub threshold_chip_dumping: usize,
    pub threshold_bot: usize,
    pub threshold_anomaly: usize,
}

impl Default for AutoBanConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            high_severity_immediate: true,
            temp_ban_duration: Duration::from_secs(24 * 3600),
            detection_window: Duration::from_secs(30 * 24 * 3600),
            threshold_chip_dumping: 2,
            threshold_bot: 3,
            threshold_anomaly: 3,
        }
    }
}

struct FlagRecord {
    at: Instant,
    detection_type: DetectionType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBanOutcome {
    pub flagged: bool,
    pub was_banned: bool,
    pub ban_reason: Option<String>,
}

/// Accumulates suspicious-activity flags and decides when a user's pattern
/// of detections crosses into an automatic temporary ban.
pub struct AutoBanService<B: BanService, N: Notifier, A: AuditLogger> {
    config: AutoBanConfig,
    flags: HashMap<UserId, Vec<FlagRecord>>,
    ban_service: B,
    notifier: N,
    audit: A,
}

impl<B: BanService, N: Notifier, A: AuditLogger> AutoBanService<B, N, A> {
    pub fn new(config: AutoBanConfig, ban_service: B, notifier: N, audit: A) -> Self {
        Self {
            config,
            flags: HashMap::new(),
            ban_service,
            notifier,
            audit,
        }
    }

    fn threshold_for(&self, detection_type: DetectionType) -> usize {
        match detection_type {
            DetectionType::ChipDumping => self.config.threshold_chip_dumping,
            DetectionType::BotDetection => self.config.threshold_bot,
            DetectionType::AnomalyDetection => self.config.threshold_anomaly,
        }
    }

    fn recent_count(&mut self, user_id: UserId, detection_type: DetectionType) -> usize {
        let window = self.config.detection_window;
        let now = Instant::now();
        let records = self.flags.entry(user_id).or_default();
        records.retain(|r| now.duration_since(r.at) <= window);
        records.iter().filter(|r| r.detection_type == detection_type).count()
    }

    /// Records a flag and, if warranted, applies a temporary ban. Mirrors
    /// the severity-first, then-cumulative-threshold decision order: a
    /// high-severity hit can ban immediately; otherwise it takes repeated
    /// detections of the same type within the window.
    pub fn process_detection(
        &mut self,
        user_id: UserId,
        detection_type: DetectionType,
        severity: Severity,
        reasons: Vec<String>,
    ) -> AutoBanOutcome {
        self.flags.entry(user_id).or_default().push(FlagRecord {
            at: Instant::now(),
            detection_type,
        });

        if !self.config.enabled {
            self.audit.record(user_id, detection_type, severity, &reasons, false);
            return AutoBanOutcome {
                flagged: true,
                was_banned: false,
                ban_reason: None,
            };
        }

        if severity == Severity::High && self.config.high_severity_immediate {
            let reason = format!("high severity {detection_type:?}: {}", reasons.join(", "));
            self.ban_service
                .apply_temporary_ban(user_id, &reason, self.config.temp_ban_duration);
            self.notifier.notify_admins(user_id, &reasons, severity);
            self.audit.record(user_id, detection_type, severity, &reasons, true);
            return AutoBanOutcome {
                flagged: true,
                was_banned: true,
                ban_reason: Some(reason),
            };
        }

        let count = self.recent_count(user_id, detection_type);
        let threshold = self.threshold_for(detection_type);
        if count >= threshold {
            let reason = format!("threshold exceeded ({count}/{threshold}) for {detection_type:?}");
            self.ban_service
                .apply_temporary_ban(user_id, &reason, self.config.temp_ban_duration);
            self.notifier.notify_admins(user_id, &reasons, severity);
            self.audit.record(user_id, detection_type, severity, &reasons, true);
            return AutoBanOutcome {
                flagged: true,
                was_banned: true,
                ban_reason: Some(reason),
            };
        }

        if matches!(severity, Severity::High | Severity::Medium) {
            self.notifier.notify_admins(user_id, &reasons, severity);
        }
        self.audit.record(user_id, detection_type, severity, &reasons, false);
        AutoBanOutcome {
            flagged: true,
            was_banned: false,
            ban_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBanService {
        bans: Mutex<Vec<UserId>>,
    }
    impl BanService for RecordingBanService {
        fn apply_temporary_ban(&self, user_id: UserId, _reason: &str, _duration: Duration) {
            self.bans.lock().unwrap().push(user_id);
        }
    }

    #[test]
    fn high_severity_bans_immediately() {
        let mut service =
            AutoBanService::new(AutoBanConfig::default(), RecordingBanService::default(), LoggingNotifier, LoggingAuditLogger);
        let user = UserId::default();
        let outcome = service.process_detection(
            user,
            DetectionType::BotDetection,
            Severity::High,
            vec!["likely_bot".into()],
        );
        assert!(outcome.was_banned);
    }

    #[test]
    fn medium_severity_needs_threshold() {
        let mut service =
            AutoBanService::new(AutoBanConfig::default(), RecordingBanService::default(), LoggingNotifier, LoggingAuditLogger);
        let user = UserId::default();
        let first = service.process_detection(
            user,
            DetectionType::AnomalyDetection,
            Severity::Medium,
            vec!["statistical_anomaly".into()],
        );
        assert!(!first.was_banned);
        service.process_detection(
            user,
            DetectionType::AnomalyDetection,
            Severity::Medium,
            vec!["statistical_anomaly".into()],
        );
        let third = service.process_detection(
            user,
            DetectionType::AnomalyDetection,
            Severity::Medium,
            vec!["statistical_anomaly".into()],
        );
        assert!(third.was_banned);
    }

    #[test]
    fn disabled_auto_ban_only_flags() {
        let mut config = AutoBanConfig::default();
        config.enabled = false;
        let mut service = AutoBanService::new(config, RecordingBanService::default(), LoggingNotifier, LoggingAuditLogger);
        let outcome = service.process_detection(
            UserId::default(),
            DetectionType::BotDetection,
            Severity::High,
            vec![],
        );
        assert!(!outcome.was_banned);
        assert!(outcome.flagged);
    }
}
