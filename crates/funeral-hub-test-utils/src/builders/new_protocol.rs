use chrono::{DateTime, Duration, NaiveDate, Utc};
use funeral_hub_core::{Deceased, GroupId, NewProtocol, UploadedFile, UserId};

use crate::data_generators::{death_declaration, deceased};

/// Builder for valid (or deliberately invalid) creation requests
#[derive(Debug, Clone)]
pub struct NewProtocolBuilder {
    request: NewProtocol,
}

impl Default for NewProtocolBuilder {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            request: NewProtocol {
                deceased: deceased("José da Silva"),
                death_at: Some(now - Duration::hours(6)),
                burial_scheduled_at: Some(now + Duration::days(1)),
                group_id: None,
                declarant_id: None,
                death_declaration: Some(death_declaration()),
                supporting_documents: Vec::new(),
            },
        }
    }
}

impl NewProtocolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deceased(mut self, deceased: Deceased) -> Self {
        self.request.deceased = deceased;
        self
    }

    pub fn full_name(mut self, name: &str) -> Self {
        self.request.deceased.full_name = name.to_string();
        self
    }

    pub fn birth_date(mut self, date: NaiveDate) -> Self {
        self.request.deceased.birth_date = date;
        self
    }

    pub fn death_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.request.death_at = at;
        self
    }

    pub fn burial_scheduled_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.request.burial_scheduled_at = at;
        self
    }

    pub fn group(mut self, group: GroupId) -> Self {
        self.request.group_id = Some(group);
        self
    }

    pub fn declarant(mut self, declarant: UserId) -> Self {
        self.request.declarant_id = Some(declarant);
        self
    }

    pub fn without_declaration(mut self) -> Self {
        self.request.death_declaration = None;
        self
    }

    pub fn declaration(mut self, file: UploadedFile) -> Self {
        self.request.death_declaration = Some(file);
        self
    }

    pub fn supporting(mut self, file: UploadedFile) -> Self {
        self.request.supporting_documents.push(file);
        self
    }

    pub fn build(self) -> NewProtocol {
        self.request
    }
}
