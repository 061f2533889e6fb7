//! Term matching and ranking for `GET /contacts/search`.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::modules::contacts::availability::check_availability;
use crate::modules::contacts::model::{
    Contact, ContactKind, ContactSearchParams, ContactSearchResponse, ContactSearchResult,
};

const NAME_WEIGHT: u32 = 3;
const SUBJECT_WEIGHT: u32 = 2;
const ROLE_TITLE_WEIGHT: u32 = 2;
const DEPARTMENT_WEIGHT: u32 = 1;

/// Case-insensitive relevance of `contact` for `term`; zero means no match.
/// Without a term every contact scores 1.
pub fn relevance(contact: &Contact, term: Option<&str>) -> u32 {
    let Some(term) = term.map(str::to_lowercase) else {
        return 1;
    };
    let hit = |text: &str| text.to_lowercase().contains(&term);

    let mut score = 0;
    if hit(&contact.user_name) {
        score += NAME_WEIGHT;
    }
    if contact.subjects.iter().any(|s| hit(s)) {
        score += SUBJECT_WEIGHT;
    }
    if hit(&contact.role_title) {
        score += ROLE_TITLE_WEIGHT;
    }
    if contact.department.as_deref().is_some_and(hit) {
        score += DEPARTMENT_WEIGHT;
    }
    score
}

/// Filters, ranks and groups contacts, annotating each with its availability at `at`.
pub fn search(
    contacts: Vec<Contact>,
    params: &ContactSearchParams,
    at: NaiveDateTime,
) -> ContactSearchResponse {
    let term = params
        .term
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let mut ranked: Vec<ContactSearchResult> = contacts
        .into_iter()
        .filter(|c| !params.has_schedule_filter() || c.office_hours.iter().any(|s| params.matches_slot(s)))
        .filter_map(|contact| {
            let score = relevance(&contact, term);
            (score > 0).then(|| ContactSearchResult {
                availability: check_availability(&contact.office_hours, at),
                relevance: score,
                contact,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.relevance
            .cmp(&a.relevance)
            .then_with(|| a.contact.user_name.cmp(&b.contact.user_name))
    });

    let total = ranked.len();
    let mut results: BTreeMap<ContactKind, Vec<ContactSearchResult>> = BTreeMap::new();
    for result in ranked {
        results.entry(result.contact.kind).or_default().push(result);
    }

    ContactSearchResponse {
        total,
        term: term.unwrap_or("all").to_string(),
        filters: params.filters(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::contacts::model::{OfficeHours, SchoolDay};
    use chrono::{NaiveDate, Utc};
    use escola_models::{ContactId, UserId};
    use sqlx::types::Json;

    fn contact(name: &str, kind: ContactKind, role_title: &str, subjects: &[&str]) -> Contact {
        Contact {
            id: ContactId::new(),
            user_id: UserId::new(),
            user_name: name.to_string(),
            user_email: format!("{}@escola.test", name.to_lowercase()),
            kind,
            role_title: role_title.to_string(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            office_hours: Json(vec![OfficeHours {
                day: SchoolDay::Segunda,
                start_time: "08:00".parse().unwrap(),
                end_time: "12:00".parse().unwrap(),
                location: None,
            }]),
            phone: None,
            professional_email: None,
            room: None,
            department: Some("Ciências Exatas".to_string()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn monday_nine() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_relevance_weights() {
        let c = contact("Maria Matos", ContactKind::Teacher, "Professora", &["Matemática"]);
        assert_eq!(relevance(&c, None), 1);
        assert_eq!(relevance(&c, Some("MAT")), NAME_WEIGHT + SUBJECT_WEIGHT);
        assert_eq!(relevance(&c, Some("profes")), ROLE_TITLE_WEIGHT);
        assert_eq!(relevance(&c, Some("exatas")), DEPARTMENT_WEIGHT);
        assert_eq!(relevance(&c, Some("história")), 0);
    }

    #[test]
    fn test_search_ranks_and_groups() {
        let contacts = vec![
            contact("Paulo", ContactKind::Coordination, "Coordenador de Matemática", &[]),
            contact("Matheus", ContactKind::Teacher, "Professor", &["Matemática"]),
            contact("Rita", ContactKind::Secretariat, "Secretária", &[]),
        ];
        let params = ContactSearchParams {
            term: Some("mat".to_string()),
            ..Default::default()
        };

        let response = search(contacts, &params, monday_nine());
        assert_eq!(response.total, 2);
        assert_eq!(response.term, "mat");
        assert_eq!(response.results[&ContactKind::Teacher][0].relevance, 5);
        assert_eq!(response.results[&ContactKind::Coordination][0].relevance, 2);
        assert!(!response.results.contains_key(&ContactKind::Secretariat));
        assert!(response.results[&ContactKind::Teacher][0].availability.available);
    }

    #[test]
    fn test_blank_term_lists_everyone() {
        let contacts = vec![
            contact("Paulo", ContactKind::Coordination, "Coordenador", &[]),
            contact("Rita", ContactKind::Secretariat, "Secretária", &[]),
        ];
        let params = ContactSearchParams {
            term: Some("  ".to_string()),
            ..Default::default()
        };

        let response = search(contacts, &params, monday_nine());
        assert_eq!(response.total, 2);
        assert_eq!(response.term, "all");
    }

    #[test]
    fn test_schedule_filter_excludes_other_days() {
        let contacts = vec![contact("Rita", ContactKind::Secretariat, "Secretária", &[])];
        let params = ContactSearchParams {
            day: Some(SchoolDay::Sexta),
            ..Default::default()
        };

        assert_eq!(search(contacts, &params, monday_nine()).total, 0);
    }
}
