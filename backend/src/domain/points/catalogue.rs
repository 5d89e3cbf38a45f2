//! Activities users may report for themselves, and their fixed rewards.

/// Catalogue entry; the server, not the client, decides the points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogueActivity {
    pub slug: &'static str,
    pub label: &'static str,
    pub points: u32,
    /// `false` for activities only an admin may credit.
    pub self_reportable: bool,
}

pub const ACTIVITY_CATALOGUE: &[CatalogueActivity] = &[
    CatalogueActivity {
        slug: "daily_check_in",
        label: "Daily check-in",
        points: 5,
        self_reportable: true,
    },
    CatalogueActivity {
        slug: "video_watched",
        label: "Watched a recruitment video",
        points: 10,
        self_reportable: true,
    },
    CatalogueActivity {
        slug: "content_shared",
        label: "Shared recruitment content",
        points: 15,
        self_reportable: true,
    },
    CatalogueActivity {
        slug: "trivia_completed",
        label: "Completed a trivia round",
        points: 20,
        self_reportable: true,
    },
    CatalogueActivity {
        slug: "event_attended",
        label: "Attended a recruitment event",
        points: 50,
        self_reportable: true,
    },
    CatalogueActivity {
        slug: "application_started",
        label: "Started an application",
        points: 100,
        self_reportable: true,
    },
    CatalogueActivity {
        slug: "application_submission",
        label: "Submitted an application",
        points: 500,
        self_reportable: false,
    },
];

/// Find a catalogue entry by slug.
pub fn lookup_activity(slug: &str) -> Option<&'static CatalogueActivity> {
    ACTIVITY_CATALOGUE.iter().find(|activity| activity.slug == slug)
}
