//! Who may do what to which survey.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::{SurveyRecord, SurveyResponseRecord},
    types::UserRole,
};

/// The authenticated caller as reported by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: UserRole,
    /// Access token the request authenticated with, if any.
    pub token_id: Option<Uuid>,
}

impl Principal {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self {
            user_id,
            role,
            token_id: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn owns(&self, survey: &SurveyRecord) -> bool {
        survey.created_by == self.user_id
    }

    /// Editing content, toggling the active flag and adding questions.
    pub fn can_manage(&self, survey: &SurveyRecord) -> bool {
        self.owns(survey) || self.role.is_staff()
    }

    /// Deletion cascades to every response, so only the owner may do it.
    pub fn can_delete(&self, survey: &SurveyRecord) -> bool {
        self.owns(survey)
    }

    pub fn can_view_responses(&self, survey: &SurveyRecord) -> bool {
        self.can_manage(survey)
    }

    pub fn can_answer(&self, session: &SurveyResponseRecord) -> bool {
        match session.respondent_id {
            Some(respondent) => respondent == self.user_id,
            None => true,
        }
    }

    pub fn can_view_session(&self, session: &SurveyResponseRecord, survey: &SurveyRecord) -> bool {
        session.respondent_id == Some(self.user_id) || self.can_view_responses(survey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn survey(owner: Uuid) -> SurveyRecord {
        SurveyRecord {
            id: Uuid::new_v4(),
            title: "t".into(),
            description: None,
            is_active: true,
            created_by: owner,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn staff_manage_but_only_owner_deletes() {
        let owner = Principal::new(Uuid::new_v4(), UserRole::User);
        let moderator = Principal::new(Uuid::new_v4(), UserRole::Moderator);
        let stranger = Principal::new(Uuid::new_v4(), UserRole::User);
        let survey = survey(owner.user_id);

        assert!(owner.can_manage(&survey) && owner.can_delete(&survey));
        assert!(moderator.can_manage(&survey));
        assert!(!moderator.can_delete(&survey));
        assert!(!stranger.can_manage(&survey));
    }

    #[test]
    fn sessions_belong_to_their_respondent() {
        let respondent = Principal::new(Uuid::new_v4(), UserRole::User);
        let other = Principal::new(Uuid::new_v4(), UserRole::User);
        let session = SurveyResponseRecord {
            id: Uuid::new_v4(),
            survey_id: Uuid::new_v4(),
            respondent_id: Some(respondent.user_id),
            started_at: OffsetDateTime::UNIX_EPOCH,
            completed_at: None,
            is_completed: false,
        };
        assert!(respondent.can_answer(&session));
        assert!(!other.can_answer(&session));
    }
}
