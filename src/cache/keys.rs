//! Cache tags and query identities.
//!
//! Tags are a closed set rendered to their wire form only through `Display`,
//! so a misspelt tag cannot compile.

use std::fmt;

use uuid::Uuid;

/// Invalidation label shared by every cached result derived from one data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    /// Every survey list.
    Surveys,
    Survey(Uuid),
    /// Surveys created by one user.
    UserSurveys(Uuid),
    ActiveSurveys,
    InactiveSurveys,
    Questions(Uuid),
    SurveyResponses(Uuid),
    /// Global count of completed sessions.
    CompletedResponses,
    User(Uuid),
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surveys => f.write_str("surveys"),
            Self::Survey(id) => write!(f, "survey-{id}"),
            Self::UserSurveys(id) => write!(f, "user-surveys-{id}"),
            Self::ActiveSurveys => f.write_str("active-surveys"),
            Self::InactiveSurveys => f.write_str("inactive-surveys"),
            Self::Questions(id) => write!(f, "questions-{id}"),
            Self::SurveyResponses(id) => write!(f, "survey-responses-{id}"),
            Self::CompletedResponses => f.write_str("completed-responses"),
            Self::User(id) => write!(f, "user-{id}"),
        }
    }
}

/// Identity of one cacheable read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    AllSurveys,
    SurveysByActive(bool),
    SurveyById(Uuid),
    SurveysByOwner(Uuid),
    QuestionsBySurvey(Uuid),
    ResponsesBySurvey(Uuid),
    CompletedResponseCount,
    UserById(Uuid),
}

/// Staleness class a query family is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDuration {
    Short,
    Medium,
    Long,
    /// No query family uses this class yet; `cache.very_long_ttl_secs` is
    /// accepted so deployments can set it ahead of one.
    VeryLong,
}

impl QueryKey {
    /// Tags the result is registered under.
    pub fn tags(&self) -> Vec<CacheTag> {
        match self {
            Self::AllSurveys => vec![CacheTag::Surveys],
            Self::SurveysByActive(true) => vec![CacheTag::ActiveSurveys, CacheTag::Surveys],
            Self::SurveysByActive(false) => vec![CacheTag::InactiveSurveys, CacheTag::Surveys],
            Self::SurveyById(id) => vec![CacheTag::Survey(*id)],
            Self::SurveysByOwner(owner) => vec![CacheTag::UserSurveys(*owner), CacheTag::Surveys],
            Self::QuestionsBySurvey(survey) => vec![CacheTag::Questions(*survey)],
            Self::ResponsesBySurvey(survey) => vec![CacheTag::SurveyResponses(*survey)],
            Self::CompletedResponseCount => vec![CacheTag::CompletedResponses],
            Self::UserById(id) => vec![CacheTag::User(*id)],
        }
    }

    pub fn duration(&self) -> CacheDuration {
        match self {
            Self::SurveysByActive(true) => CacheDuration::Short,
            Self::ResponsesBySurvey(_) | Self::CompletedResponseCount => CacheDuration::Short,
            Self::AllSurveys
            | Self::SurveysByActive(false)
            | Self::SurveysByOwner(_)
            | Self::QuestionsBySurvey(_) => CacheDuration::Medium,
            Self::SurveyById(_) | Self::UserById(_) => CacheDuration::Long,
        }
    }

    /// Low-cardinality label for metrics and logs.
    pub fn family(&self) -> &'static str {
        match self {
            Self::AllSurveys => "surveys",
            Self::SurveysByActive(true) => "surveys_active",
            Self::SurveysByActive(false) => "surveys_inactive",
            Self::SurveyById(_) => "survey",
            Self::SurveysByOwner(_) => "user_surveys",
            Self::QuestionsBySurvey(_) => "questions",
            Self::ResponsesBySurvey(_) => "responses",
            Self::CompletedResponseCount => "completed_count",
            Self::UserById(_) => "user",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_render_wire_names() {
        let id = Uuid::nil();
        assert_eq!(CacheTag::Surveys.to_string(), "surveys");
        assert_eq!(
            CacheTag::Survey(id).to_string(),
            "survey-00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            CacheTag::UserSurveys(id).to_string(),
            format!("user-surveys-{id}")
        );
        assert_eq!(CacheTag::ActiveSurveys.to_string(), "active-surveys");
        assert_eq!(CacheTag::InactiveSurveys.to_string(), "inactive-surveys");
        assert_eq!(CacheTag::Questions(id).to_string(), format!("questions-{id}"));
        assert_eq!(
            CacheTag::SurveyResponses(id).to_string(),
            format!("survey-responses-{id}")
        );
        assert_eq!(
            CacheTag::CompletedResponses.to_string(),
            "completed-responses"
        );
        assert_eq!(CacheTag::User(id).to_string(), format!("user-{id}"));
    }

    #[test]
    fn volatile_families_get_short_ttl() {
        assert_eq!(QueryKey::SurveysByActive(true).duration(), CacheDuration::Short);
        assert_eq!(
            QueryKey::ResponsesBySurvey(Uuid::nil()).duration(),
            CacheDuration::Short
        );
        assert_eq!(QueryKey::SurveyById(Uuid::nil()).duration(), CacheDuration::Long);
        assert_eq!(QueryKey::UserById(Uuid::nil()).duration(), CacheDuration::Long);
    }

    #[test]
    fn partition_lists_carry_the_global_list_tag() {
        assert!(QueryKey::SurveysByActive(false).tags().contains(&CacheTag::Surveys));
        assert!(
            QueryKey::SurveysByOwner(Uuid::nil())
                .tags()
                .contains(&CacheTag::UserSurveys(Uuid::nil()))
        );
    }

    #[test]
    fn very_long_class_is_unused() {
        let id = Uuid::nil();
        let keys = [
            QueryKey::AllSurveys,
            QueryKey::SurveysByActive(true),
            QueryKey::SurveysByActive(false),
            QueryKey::SurveyById(id),
            QueryKey::SurveysByOwner(id),
            QueryKey::QuestionsBySurvey(id),
            QueryKey::ResponsesBySurvey(id),
            QueryKey::CompletedResponseCount,
            QueryKey::UserById(id),
        ];
        assert!(keys.iter().all(|key| key.duration() != CacheDuration::VeryLong));
    }
}
