//! Alert classification: upstream event name → notification tier → rendered text.
//!
//! Most event types map to exactly one tier. Two are escalated:
//! - Tornado Warning: "tornado emergency" beats "particularly dangerous situation",
//!   which beats the base warning. Both headline and description are searched,
//!   case-insensitively.
//! - Severe Thunderstorm Warning: the exact tag `DamageThreatDestructive` selects
//!   the destructive tier.

use serde::Serialize;

use crate::ingest::cache::CacheEntry;
use crate::ingest::types::RawAlert;
use crate::notify::Notification;

pub const DESTRUCTIVE_TAG: &str = "DamageThreatDestructive";
const TORNADO_EMERGENCY_PHRASE: &str = "tornado emergency";
const PDS_PHRASE: &str = "particularly dangerous situation";

/// Upstream event types we have a template for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TornadoWarning,
    TornadoWatch,
    ExtremeHeatWarning,
    ExtremeWindWarning,
    ExtremeColdWarning,
    SevereThunderstormWarning,
    SevereThunderstormWatch,
    WinterStormWarning,
    WinterStormWatch,
    FlashFloodWarning,
    FloodWarning,
    FloodWatch,
    AirQualityAlert,
    DenseFogAdvisory,
    SpecialWeatherStatement,
    Unrecognized,
}

impl EventKind {
    pub fn from_event(name: &str) -> Self {
        match name {
            "Tornado Warning" => EventKind::TornadoWarning,
            "Tornado Watch" => EventKind::TornadoWatch,
            "Extreme Heat Warning" => EventKind::ExtremeHeatWarning,
            "Extreme Wind Warning" => EventKind::ExtremeWindWarning,
            "Extreme Cold Warning" => EventKind::ExtremeColdWarning,
            "Severe Thunderstorm Warning" => EventKind::SevereThunderstormWarning,
            "Severe Thunderstorm Watch" => EventKind::SevereThunderstormWatch,
            "Winter Storm Warning" => EventKind::WinterStormWarning,
            "Winter Storm Watch" => EventKind::WinterStormWatch,
            "Flash Flood Warning" => EventKind::FlashFloodWarning,
            "Flood Warning" => EventKind::FloodWarning,
            "Flood Watch" => EventKind::FloodWatch,
            "Air Quality Alert" => EventKind::AirQualityAlert,
            "Dense Fog Advisory" => EventKind::DenseFogAdvisory,
            "Special Weather Statement" => EventKind::SpecialWeatherStatement,
            _ => EventKind::Unrecognized,
        }
    }
}

/// Escalation level chosen for one alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    TornadoEmergency,
    PdsTornadoWarning,
    TornadoWarning,
    TornadoWatch,
    ExtremeHeatWarning,
    ExtremeWindWarning,
    ExtremeColdWarning,
    DestructiveSevereThunderstormWarning,
    SevereThunderstormWarning,
    SevereThunderstormWatch,
    WinterStormWarning,
    WinterStormWatch,
    FlashFloodWarning,
    FloodWarning,
    FloodWatch,
    AirQualityAlert,
    DenseFogAdvisory,
    SpecialWeatherStatement,
}

impl Tier {
    pub fn label(self) -> &'static str {
        match self {
            Tier::TornadoEmergency => "Tornado Emergency",
            Tier::PdsTornadoWarning => "PDS Tornado Warning",
            Tier::TornadoWarning => "Tornado Warning",
            Tier::TornadoWatch => "Tornado Watch",
            Tier::ExtremeHeatWarning => "Extreme Heat Warning",
            Tier::ExtremeWindWarning => "Extreme Wind Warning",
            Tier::ExtremeColdWarning => "Extreme Cold Warning",
            Tier::DestructiveSevereThunderstormWarning => "Destructive Severe Thunderstorm Warning",
            Tier::SevereThunderstormWarning => "Severe Thunderstorm Warning",
            Tier::SevereThunderstormWatch => "Severe Thunderstorm Watch",
            Tier::WinterStormWarning => "Winter Storm Warning",
            Tier::WinterStormWatch => "Winter Storm Watch",
            Tier::FlashFloodWarning => "Flash Flood Warning",
            Tier::FloodWarning => "Flood Warning",
            Tier::FloodWatch => "Flood Watch",
            Tier::AirQualityAlert => "Air Quality Alert",
            Tier::DenseFogAdvisory => "Dense Fog Advisory",
            Tier::SpecialWeatherStatement => "Special Weather Statement",
        }
    }

    /// Colour/icon triplet framing the title.
    fn banner(self) -> &'static str {
        match self {
            Tier::TornadoEmergency => "🟪🌪️🟪",
            Tier::PdsTornadoWarning | Tier::TornadoWarning => "🟥🌪️🟥",
            Tier::TornadoWatch => "🟨🌪️🟨",
            Tier::ExtremeHeatWarning => "🟨🔥🟨",
            Tier::ExtremeWindWarning => "🟪💨🟪",
            Tier::ExtremeColdWarning => "🟨🥶🟨",
            Tier::DestructiveSevereThunderstormWarning => "🟪⛈️🟪",
            Tier::SevereThunderstormWarning => "🟥⛈️🟥",
            Tier::SevereThunderstormWatch => "🟨⛈️🟨",
            Tier::WinterStormWarning => "🟥🌨️🟥",
            Tier::WinterStormWatch => "🟨🌨️🟨",
            Tier::FlashFloodWarning | Tier::FloodWarning => "🟥🌊🟥",
            Tier::FloodWatch => "🟨🌊🟨",
            Tier::AirQualityAlert => "🟨🌁🟨",
            Tier::DenseFogAdvisory => "🟨🌫️🟨",
            Tier::SpecialWeatherStatement => "🟨📣🟨",
        }
    }

    fn call_to_action(self) -> Option<&'static str> {
        match self {
            Tier::TornadoEmergency => Some("SEEK SHELTER IMMEDIATELY. THIS IS A DEADLY SITUATION."),
            Tier::PdsTornadoWarning => {
                Some("THIS IS A PARTICULARLY DANGEROUS SITUATION. SEEK SHELTER IMMEDIATELY.")
            }
            Tier::ExtremeWindWarning => {
                Some("SUSTAINED WINDS OF 110+ MPH ARE EXPECTED. SEEK SHELTER IMMEDIATELY.")
            }
            _ => None,
        }
    }

    /// Fill the tier's template.
    pub fn render(self, location: &str, headline: &str, message_type: &str) -> String {
        let b = self.banner();
        let header = format!("{b} {} for {location} {b}", self.label().to_uppercase());
        let mut out = match self {
            Tier::SpecialWeatherStatement => return format!("{header} ({message_type})"),
            Tier::TornadoEmergency | Tier::PdsTornadoWarning => format!("{header}\n{headline}"),
            _ => format!("{header}\n{headline} ({message_type})"),
        };
        if let Some(cta) = self.call_to_action() {
            out.push('\n');
            out.push_str(cta);
        }
        out
    }
}

/// Tornado Warning escalation, in strict priority order.
pub fn tornado_tier(headline: &str, description: &str) -> Tier {
    let headline = headline.to_lowercase();
    let description = description.to_lowercase();
    let mentions = |phrase: &str| headline.contains(phrase) || description.contains(phrase);

    if mentions(TORNADO_EMERGENCY_PHRASE) {
        Tier::TornadoEmergency
    } else if mentions(PDS_PHRASE) {
        Tier::PdsTornadoWarning
    } else {
        Tier::TornadoWarning
    }
}

/// Severe Thunderstorm Warning escalation: exact, case-sensitive tag match.
pub fn thunderstorm_tier(tags: &[String]) -> Tier {
    if tags.iter().any(|t| t == DESTRUCTIVE_TAG) {
        Tier::DestructiveSevereThunderstormWarning
    } else {
        Tier::SevereThunderstormWarning
    }
}

/// Tier for an alert, or `None` when its event type has no template.
pub fn tier_for(alert: &RawAlert) -> Option<Tier> {
    let tier = match EventKind::from_event(&alert.event) {
        EventKind::TornadoWarning => tornado_tier(&alert.headline, &alert.description),
        EventKind::SevereThunderstormWarning => thunderstorm_tier(&alert.tags),
        EventKind::TornadoWatch => Tier::TornadoWatch,
        EventKind::ExtremeHeatWarning => Tier::ExtremeHeatWarning,
        EventKind::ExtremeWindWarning => Tier::ExtremeWindWarning,
        EventKind::ExtremeColdWarning => Tier::ExtremeColdWarning,
        EventKind::SevereThunderstormWatch => Tier::SevereThunderstormWatch,
        EventKind::WinterStormWarning => Tier::WinterStormWarning,
        EventKind::WinterStormWatch => Tier::WinterStormWatch,
        EventKind::FlashFloodWarning => Tier::FlashFloodWarning,
        EventKind::FloodWarning => Tier::FloodWarning,
        EventKind::FloodWatch => Tier::FloodWatch,
        EventKind::AirQualityAlert => Tier::AirQualityAlert,
        EventKind::DenseFogAdvisory => Tier::DenseFogAdvisory,
        EventKind::SpecialWeatherStatement => Tier::SpecialWeatherStatement,
        EventKind::Unrecognized => return None,
    };
    Some(tier)
}

/// Ready-to-send alert plus what the dedup cache needs to admit it.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAlert {
    pub id: String,
    pub tier: Tier,
    pub notification: Notification,
    pub entry: CacheEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Rendered(RenderedAlert),
    Unsupported { event: String },
}

/// Build the notification for an alert seen at `location`.
pub fn render_notification(tier: Tier, location: &str, alert: &RawAlert) -> Notification {
    let text = tier.render(location, &alert.headline, &alert.message_type);
    match tier {
        Tier::SpecialWeatherStatement => {
            Notification::text(text).with_embed(tier.label(), alert.description.clone())
        }
        _ => Notification::text(text),
    }
}

pub fn classify(alert: &RawAlert, location: &str) -> Classification {
    let Some(tier) = tier_for(alert) else {
        return Classification::Unsupported {
            event: alert.event.clone(),
        };
    };
    Classification::Rendered(RenderedAlert {
        id: alert.id.clone(),
        tier,
        notification: render_notification(tier, location, alert),
        entry: CacheEntry::from_alert(alert, location),
    })
}
