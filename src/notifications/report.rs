//! Subject and body rendering for deployment notifications.

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::Notification;
use crate::config::EnvelopeConfig;
use crate::context::DeploymentContext;
use crate::history::ChangeLog;

lazy_static! {
    static ref TRAILING_DIGITS: Regex = Regex::new(r"(\d+)$").unwrap();
}

/// Release directories are named after their UTC creation time
const RELEASE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Timezone release times are shown in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalZone {
    pub offset: FixedOffset,
    pub label: String,
}

impl LocalZone {
    pub fn new(offset: FixedOffset, label: impl Into<String>) -> Self {
        Self {
            offset,
            label: label.into(),
        }
    }

    /// The system timezone as of now, named by its abbreviation ("EST").
    ///
    /// A configured label wins. When the system zone cannot be identified the
    /// zone is named by its offset ("UTC", "UTC-05:00").
    pub fn current(label: Option<&str>) -> Self {
        match system_timezone() {
            Some(tz) => Self::in_timezone(tz, Utc::now(), label),
            None => {
                let offset = *Local::now().offset();
                let label = match label {
                    Some(label) => label.to_string(),
                    None => offset_label(offset),
                };
                Self { offset, label }
            }
        }
    }

    /// Offset and abbreviation `tz` has at `now`
    pub fn in_timezone(tz: Tz, now: DateTime<Utc>, label: Option<&str>) -> Self {
        let local = now.with_timezone(&tz);
        let label = match label {
            Some(label) => label.to_string(),
            None => local.format("%Z").to_string(),
        };
        Self {
            offset: local.offset().fix(),
            label,
        }
    }
}

fn system_timezone() -> Option<Tz> {
    match iana_time_zone::get_timezone() {
        Ok(name) => name.parse().ok(),
        Err(e) => {
            debug!(error = %e, "Could not determine the system timezone");
            None
        }
    }
}

fn offset_label(offset: FixedOffset) -> String {
    let seconds = offset.local_minus_utc();
    if seconds == 0 {
        return "UTC".to_string();
    }
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.abs() / 60;
    format!("UTC{}{:02}:{:02}", sign, minutes / 60, minutes % 60)
}

/// English ordinal for a day of the month: 1st, 2nd, 3rd, 4th, 11th, 22nd
fn ordinalize(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", day, suffix)
}

/// Turn a timestamped release path into e.g. "June 15th, 2023 7:00 AM EST".
///
/// Returns `None` without a path, without a trailing digit run, or when the
/// digits are not a `YYYYMMDDHHMMSS` timestamp.
pub fn humanize_release_time(path: Option<&str>, zone: &LocalZone) -> Option<String> {
    let digits = TRAILING_DIGITS.captures(path?)?.get(1)?.as_str();
    let naive = NaiveDateTime::parse_from_str(digits, RELEASE_TIMESTAMP_FORMAT).ok()?;
    let local = Utc.from_utc_datetime(&naive).with_timezone(&zone.offset);

    let text = format!(
        "{} {}, {} {}",
        local.format("%B"),
        ordinalize(local.day()),
        local.format("%Y %l:%M %p"),
        zone.label
    );

    Some(text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Renders the notification text from deployment metadata and a change log
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    zone_label: Option<String>,
}

impl ReportAssembler {
    pub fn new(zone_label: Option<String>) -> Self {
        Self { zone_label }
    }

    /// Render in the system timezone, looked up once for this render
    pub fn render(
        &self,
        ctx: &DeploymentContext,
        change_log: &ChangeLog,
        envelope: &EnvelopeConfig,
    ) -> Notification {
        let zone = LocalZone::current(self.zone_label.as_deref());
        self.render_in_zone(ctx, change_log, envelope, &zone)
    }

    pub fn render_in_zone(
        &self,
        ctx: &DeploymentContext,
        change_log: &ChangeLog,
        envelope: &EnvelopeConfig,
        zone: &LocalZone,
    ) -> Notification {
        let deployed_to = ctx.deployed_to();
        let release_time = humanize_release_time(ctx.current_release.as_deref(), zone);
        let previous_release_time = humanize_release_time(ctx.previous_release.as_deref(), zone);

        let subject = format!("{} {} {}", envelope.email_prefix, ctx.application, deployed_to);

        let summary = format!(
            "{} was {} by {} at {}.",
            ctx.application,
            deployed_to,
            ctx.actor,
            release_time.as_deref().unwrap_or_default()
        );

        let comment = ctx
            .comment
            .as_ref()
            .map(|c| format!("Comment: {}.\n", c))
            .unwrap_or_default();

        let body = format!(
            r#"{summary}
{comment}
Deployment details
==================
Release: {release}
Release Time: {release_time}
Release Revision: {revision}

Previous Release: {previous_release}
Previous Release Time: {previous_release_time}
Previous Release Revision: {previous_revision}

Repository: {repository}
Deploy path: {deploy_to}
Domain: {domain}
{scm_details}
"#,
            summary = summary,
            comment = comment,
            release = ctx.current_release.as_deref().unwrap_or_default(),
            release_time = release_time.as_deref().unwrap_or_default(),
            revision = ctx.current_revision,
            previous_release = ctx.previous_release.as_deref().unwrap_or_default(),
            previous_release_time = previous_release_time.as_deref().unwrap_or_default(),
            previous_revision = ctx.previous_revision(),
            repository = ctx.repository,
            deploy_to = ctx.deploy_to,
            domain = ctx.domain.as_deref().unwrap_or_default(),
            scm_details = scm_details(ctx, change_log),
        );

        Notification {
            subject,
            body,
            recipients: envelope.recipients.iter().cloned().collect(),
            from: envelope.from.clone(),
        }
    }
}

/// Branch line plus the commit list; empty for SCMs without history
fn scm_details(ctx: &DeploymentContext, change_log: &ChangeLog) -> String {
    if !ctx.scm.has_history() {
        return String::new();
    }

    let branch = match ctx.branch.as_deref() {
        Some(branch) if !branch.is_empty() => format!("Branch: {}", branch),
        _ => String::new(),
    };

    format!(
        "{}\n\nCommits since last release\n====================\n{}\n",
        branch,
        change_log.render()
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::context::ScmKind;
    use crate::history::CommitSummary;

    fn est() -> LocalZone {
        LocalZone::new(FixedOffset::west_opt(5 * 3600).unwrap(), "EST")
    }

    fn utc() -> LocalZone {
        LocalZone::new(FixedOffset::east_opt(0).unwrap(), "UTC")
    }

    pub(crate) fn shop_context() -> DeploymentContext {
        DeploymentContext {
            application: "shop".to_string(),
            environment: Some("production".to_string()),
            scm: ScmKind::Git,
            repository: "https://github.com/acme/shop.git".to_string(),
            current_revision: "deadbee".to_string(),
            previous_revision: Some("cafebabe".to_string()),
            current_release: Some("/releases/20230101000000".to_string()),
            previous_release: Some("/releases/20221231000000".to_string()),
            deploy_to: "/var/www/shop".to_string(),
            domain: Some("shop.example.com".to_string()),
            branch: Some("main".to_string()),
            comment: None,
            github_token: None,
            actor: "alice".to_string(),
        }
    }

    fn checkout_fix() -> ChangeLog {
        ChangeLog::Entries(vec![CommitSummary::new("deadbee", "Fix checkout")])
    }

    #[test]
    fn test_ordinalize() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (23, "23rd"),
            (30, "30th"),
            (31, "31st"),
        ];
        for (day, expected) in cases {
            assert_eq!(ordinalize(day), expected);
        }
    }

    #[test]
    fn test_offset_label() {
        assert_eq!(offset_label(FixedOffset::east_opt(0).unwrap()), "UTC");
        assert_eq!(offset_label(FixedOffset::west_opt(5 * 3600).unwrap()), "UTC-05:00");
        assert_eq!(offset_label(FixedOffset::east_opt(5 * 3600 + 1800).unwrap()), "UTC+05:30");
    }

    #[test]
    fn test_humanize_release_time() {
        let text = humanize_release_time(Some("/path/to/releases/20230615120000"), &est()).unwrap();
        assert_eq!(text, "June 15th, 2023 7:00 AM EST");
        assert!(!text.contains("  "));
    }

    #[test]
    fn test_humanize_crosses_midnight() {
        let text = humanize_release_time(Some("/releases/20230101000000"), &est()).unwrap();
        assert_eq!(text, "December 31st, 2022 7:00 PM EST");
    }

    #[test]
    fn test_humanize_two_digit_hour() {
        let text = humanize_release_time(Some("/releases/20230622233000"), &utc()).unwrap();
        assert_eq!(text, "June 22nd, 2023 11:30 PM UTC");
    }

    #[test]
    fn test_humanize_absent() {
        assert!(humanize_release_time(None, &est()).is_none());
        assert!(humanize_release_time(Some("/path/with/no/digits"), &est()).is_none());
        assert!(humanize_release_time(Some("/releases/20230615120000/"), &est()).is_none());
        assert!(humanize_release_time(Some("/releases/42"), &est()).is_none());
    }

    #[test]
    fn test_current_zone_uses_label() {
        assert_eq!(LocalZone::current(Some("CET")).label, "CET");
    }

    #[test]
    fn test_zone_abbreviation() {
        let winter = Utc.with_ymd_and_hms(2023, 1, 15, 12, 0, 0).unwrap();
        let zone = LocalZone::in_timezone(chrono_tz::America::New_York, winter, None);
        assert_eq!(zone, est());

        let summer = Utc.with_ymd_and_hms(2023, 6, 15, 12, 0, 0).unwrap();
        let zone = LocalZone::in_timezone(chrono_tz::America::New_York, summer, None);
        assert_eq!(zone.label, "EDT");
        assert_eq!(zone.offset, FixedOffset::west_opt(4 * 3600).unwrap());

        let zone = LocalZone::in_timezone(chrono_tz::Europe::Berlin, winter, Some("Berlin"));
        assert_eq!(zone.label, "Berlin");
        assert_eq!(zone.offset, FixedOffset::east_opt(3600).unwrap());
    }

    #[test]
    fn test_humanize_with_zone_abbreviation() {
        let winter = Utc.with_ymd_and_hms(2023, 1, 15, 12, 0, 0).unwrap();
        let zone = LocalZone::in_timezone(chrono_tz::America::Chicago, winter, None);

        let text = humanize_release_time(Some("/r/20230615120000"), &zone).unwrap();
        assert_eq!(text, "June 15th, 2023 6:00 AM CST");
    }

    #[test]
    fn test_subject() {
        let envelope = EnvelopeConfig::default();
        let mut ctx = shop_context();
        let assembler = ReportAssembler::default();

        let n = assembler.render_in_zone(&ctx, &checkout_fix(), &envelope, &utc());
        assert_eq!(n.subject, "[DEPLOY] shop deployed to production");

        ctx.environment = None;
        let n = assembler.render_in_zone(&ctx, &checkout_fix(), &envelope, &utc());
        assert_eq!(n.subject, "[DEPLOY] shop deployed");
    }

    #[test]
    fn test_full_body_layout() {
        let mut envelope = EnvelopeConfig::default();
        envelope.recipients.insert("ops@example.com".to_string());

        let n = ReportAssembler::default().render_in_zone(&shop_context(), &checkout_fix(), &envelope, &utc());

        let expected = "shop was deployed to production by alice at January 1st, 2023 12:00 AM UTC.

Deployment details
==================
Release: /releases/20230101000000
Release Time: January 1st, 2023 12:00 AM UTC
Release Revision: deadbee

Previous Release: /releases/20221231000000
Previous Release Time: December 31st, 2022 12:00 AM UTC
Previous Release Revision: cafebabe

Repository: https://github.com/acme/shop.git
Deploy path: /var/www/shop
Domain: shop.example.com
Branch: main

Commits since last release
====================
deadbee:Fix checkout

";
        assert_eq!(n.body, expected);
        assert_eq!(n.recipients, vec!["ops@example.com".to_string()]);
        assert_eq!(n.from, envelope.from);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let n = ReportAssembler::default().render(&shop_context(), &checkout_fix(), &EnvelopeConfig::default());

        assert!(n.body.contains("shop was deployed to production by alice at "));
        assert!(n.body.contains("Branch: main"));
        assert!(n.body.contains("deadbee:Fix checkout"));
        assert!(!n.body.contains("Comment:"));
    }

    #[test]
    fn test_comment_line() {
        let mut ctx = shop_context();
        ctx.comment = Some("hotfix for cart totals".to_string());

        let n = ReportAssembler::default().render_in_zone(&ctx, &checkout_fix(), &EnvelopeConfig::default(), &utc());
        assert!(n
            .body
            .starts_with("shop was deployed to production by alice at January 1st, 2023 12:00 AM UTC.\nComment: hotfix for cart totals.\n\nDeployment details\n"));
    }

    #[test]
    fn test_unavailable_change_log() {
        let n = ReportAssembler::default().render_in_zone(
            &shop_context(),
            &ChangeLog::Unavailable,
            &EnvelopeConfig::default(),
            &utc(),
        );
        assert!(n.body.ends_with("====================\nN/A\n\n"));
    }

    #[test]
    fn test_no_branch_and_missing_release_times() {
        let mut ctx = shop_context();
        ctx.branch = Some(String::new());
        ctx.current_release = None;
        ctx.previous_release = Some("/releases/current".to_string());
        ctx.previous_revision = None;
        ctx.domain = None;

        let n = ReportAssembler::default().render_in_zone(&ctx, &checkout_fix(), &EnvelopeConfig::default(), &utc());
        assert!(n.body.starts_with("shop was deployed to production by alice at .\n"));
        assert!(n.body.contains("Release: \nRelease Time: \n"));
        assert!(n.body.contains("Previous Release Time: \nPrevious Release Revision: n/a\n"));
        assert!(n.body.contains("Domain: \n\n\nCommits since last release"));
        assert!(!n.body.contains("Branch:"));
    }

    #[test]
    fn test_scm_without_history_has_no_details() {
        let mut ctx = shop_context();
        ctx.scm = ScmKind::Other;

        let n = ReportAssembler::default().render_in_zone(&ctx, &ChangeLog::Unavailable, &EnvelopeConfig::default(), &utc());
        assert!(n.body.ends_with("Domain: shop.example.com\n\n"));
        assert!(!n.body.contains("Commits since last release"));
        assert!(!n.body.contains("Branch:"));
    }

    #[test]
    fn test_subversion_log_verbatim() {
        let mut ctx = shop_context();
        ctx.scm = ScmKind::Subversion;
        let log = ChangeLog::Raw("r43 | bob | 1 line\n\nFix checkout\n".to_string());

        let n = ReportAssembler::default().render_in_zone(&ctx, &log, &EnvelopeConfig::default(), &utc());
        assert!(n.body.contains("====================\nr43 | bob | 1 line\n\nFix checkout\n\n"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let assembler = ReportAssembler::new(Some("UTC".to_string()));
        let envelope = EnvelopeConfig::default();
        let first = assembler.render(&shop_context(), &checkout_fix(), &envelope);
        let second = assembler.render(&shop_context(), &checkout_fix(), &envelope);
        assert_eq!(first, second);
    }
}
