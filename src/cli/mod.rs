use crate::api::IdentifierKind;
use crate::error::FilterError;
use crate::history::{ContactFilter, DateFilter, FilterState};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod dispatch;
pub mod render;

pub use dispatch::dispatch;

/// `chatdesk` - browse chatbot conversation history from the terminal.
#[derive(Parser, Debug)]
#[command(name = "chatdesk")]
#[command(version)]
#[command(about = "Browse chatbot message history, guests and contacts.", long_about = None)]
pub struct Cli {
    /// Log fetch cycles, cache hits and retries
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show one page of message history
    Messages(MessagesArgs),

    /// List guest conversations with their numbers
    Guests,

    /// List the distinct contact emails and phone numbers
    Contacts,

    /// Download a conversation transcript as PDF
    ExportPdf {
        #[command(flatten)]
        target: ExportTarget,

        /// File to write the PDF to
        #[arg(short, long)]
        out: PathBuf,
    },
}

/// At most one contact filter; none means every conversation.
#[derive(Args, Debug, Default, Clone)]
#[group(multiple = false)]
pub struct ContactArgs {
    /// Only conversations with this contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Only conversations with this contact phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Only guest conversations
    #[arg(long)]
    pub guests: bool,

    /// One guest conversation, by session id
    #[arg(long, value_name = "SESSION_ID")]
    pub guest: Option<String>,
}

impl ContactArgs {
    pub fn to_filter(&self) -> ContactFilter {
        if let Some(email) = &self.email {
            ContactFilter::Email(email.clone())
        } else if let Some(phone) = &self.phone {
            ContactFilter::Phone(phone.clone())
        } else if let Some(session_id) = &self.guest {
            ContactFilter::Guest(session_id.clone())
        } else if self.guests {
            ContactFilter::Guests
        } else {
            ContactFilter::All
        }
    }
}

#[derive(Args, Debug, Default, Clone)]
pub struct MessagesArgs {
    #[command(flatten)]
    pub contact: ContactArgs,

    /// Case-insensitive text search over message content
    #[arg(short, long)]
    pub search: Option<String>,

    /// Single day (YYYY-MM-DD)
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub date: Option<String>,

    /// Range start (YYYY-MM-DD), inclusive
    #[arg(long, requires = "to")]
    pub from: Option<String>,

    /// Range end (YYYY-MM-DD), inclusive
    #[arg(long, requires = "from")]
    pub to: Option<String>,

    /// Page to show, starting at 1
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,

    /// Hide guest conversations when no contact filter is set
    #[arg(long)]
    pub exclude_guests: bool,

    /// Print the view as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl MessagesArgs {
    pub fn date_filter(&self) -> Result<Option<DateFilter>, FilterError> {
        if let Some(day) = &self.date {
            return Ok(Some(DateFilter::Day(DateFilter::parse_day(day)?)));
        }
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => Ok(Some(DateFilter::range(
                DateFilter::parse_day(from)?,
                DateFilter::parse_day(to)?,
            )?)),
            _ => Ok(None),
        }
    }

    pub fn filter_state(&self) -> Result<FilterState, FilterError> {
        let mut filters = FilterState::default();
        filters.select(self.contact.to_filter());
        filters.set_include_guests(!self.exclude_guests);
        if let Some(search) = &self.search {
            filters.set_search(search.as_str());
        }
        filters.set_date(self.date_filter()?);
        Ok(filters)
    }
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ExportTarget {
    /// Transcript for a contact email
    #[arg(long)]
    pub email: Option<String>,

    /// Transcript for a contact phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Transcript for a session id
    #[arg(long)]
    pub session: Option<String>,
}

impl ExportTarget {
    pub fn identifier(&self) -> Option<(IdentifierKind, &str)> {
        self.email
            .as_deref()
            .map(|v| (IdentifierKind::Email, v))
            .or_else(|| self.phone.as_deref().map(|v| (IdentifierKind::Phone, v)))
            .or_else(|| {
                self.session
                    .as_deref()
                    .map(|v| (IdentifierKind::Session, v))
            })
    }
}
