//! Roster pipeline: member rows -> grouped view -> paginated embed -> channel.

mod aggregate;
mod publish;
mod render;

pub use aggregate::{
    aggregate, build_roster, format_member_line, RankGroup, RosterSections, RosterView,
    SpecialSection, SubBranchGroup,
};
pub use publish::{PublishError, RefreshSummary, RosterPublisher, SyncOutcome};
pub use render::{
    rank_section, render_roster, sub_header, EmbedField, FieldPager, RosterEmbed,
    MAX_FIELD_LENGTH, ROSTER_COLOR,
};
