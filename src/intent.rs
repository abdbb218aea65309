//! Keyword intent routing for non-wage messages.

use serde::{Deserialize, Serialize};

/// What a user message is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Services,
    Contact,
    Appointment,
    Hours,
    Location,
    Founder,
    Motto,
    Staffing,
    Industries,
    Experience,
    Policy,
    /// Anything the keywords don't cover.
    GeneralQa,
}

/// Keyword table, checked in order; the first contained keyword wins.
const KEYWORDS: &[(&str, Intent)] = &[
    ("greeting", Intent::Greeting),
    ("hello", Intent::Greeting),
    ("service", Intent::Services),
    ("offer", Intent::Services),
    ("contact", Intent::Contact),
    ("email", Intent::Contact),
    ("appointment", Intent::Appointment),
    ("book", Intent::Appointment),
    ("hour", Intent::Hours),
    ("time", Intent::Hours),
    ("location", Intent::Location),
    ("address", Intent::Location),
    ("founder", Intent::Founder),
    ("motto", Intent::Motto),
    ("staff", Intent::Staffing),
    ("industry", Intent::Industries),
    ("experience", Intent::Experience),
    ("policy", Intent::Policy),
];

/// Reply for messages that match no keyword.
pub const GENERAL_REPLY: &str = "I can help with SLCI services, labour law compliance and minimum wages.\n\
     For anything else, call +91 9999329153 or email contact@slci.in.";

impl Intent {
    /// Classify `message` by keyword.
    #[must_use]
    pub fn classify(message: &str) -> Self {
        Self::from_label("", message)
    }

    /// Resolve a model-produced category `label` for `message`.
    ///
    /// Each keyword is looked for in the label and then in the message before
    /// moving to the next one, so free-form labels still land on an intent.
    #[must_use]
    pub fn from_label(label: &str, message: &str) -> Self {
        let label = label.to_lowercase();
        let message = message.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(keyword, _)| label.contains(keyword) || message.contains(keyword))
            .map_or(Self::GeneralQa, |&(_, intent)| intent)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Services => "services",
            Self::Contact => "contact",
            Self::Appointment => "appointment",
            Self::Hours => "hours",
            Self::Location => "location",
            Self::Founder => "founder",
            Self::Motto => "motto",
            Self::Staffing => "staffing",
            Self::Industries => "industries",
            Self::Experience => "experience",
            Self::Policy => "policy",
            Self::GeneralQa => "general_qa",
        }
    }

    /// The canned answer for this intent.
    pub const fn reply(self) -> &'static str {
        match self {
            Self::Greeting => "Hey there! 👋 I'm Tara, your SLCI assistant. How can I help?",
            Self::Services => {
                "We offer:\n• ESI & EPF Compliance\n• Labour Law Compliances\n• HR Solutions\n• Payroll Services\n• Staffing"
            }
            Self::Contact => "📞 Call: +91 9999329153 or 011-41609501\n✉️ Email: contact@slci.in",
            Self::Appointment => {
                "📅 Book an appointment by calling +91 9999329153 or emailing contact@slci.in."
            }
            Self::Hours => "🕒 Office Hours: Monday–Saturday, 9:30 AM – 6:30 PM.",
            Self::Location => {
                "📍 Address: 83, DSIDC Complex, Okhla Industrial Area Phase 1, New Delhi - 110020."
            }
            Self::Founder => {
                "👔 Founded by Mr. S.K. Sharma, with 38+ years of experience in compliance & HR law."
            }
            Self::Motto => "💼 Our Motto: 'Do Business, Not HR.'",
            Self::Staffing => {
                "🤝 Staffing services include recruitment, verification, and third-party manpower."
            }
            Self::Industries => {
                "🏭 We serve manufacturing, logistics, IT, healthcare, and retail industries."
            }
            Self::Experience => "📚 Over 38 years of domain experience in law, compliance & HR services.",
            Self::Policy => {
                "🔐 **Privacy Policy**\n\n\
                 • Data We Collect: Only necessary client & compliance details.\n\
                 • How We Use It: Exclusively for representation, billing & communication.\n\
                 • Sharing: Never sold. Shared only with consent or legal requirement.\n\
                 • Security: Protected under strong confidentiality measures."
            }
            Self::GeneralQa => GENERAL_REPLY,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
