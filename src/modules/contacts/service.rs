use anyhow::anyhow;
use escola_core::{AppError, UserRole};
use escola_models::ContactId;
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::BTreeMap;
use tracing::instrument;

use crate::middleware::auth::Caller;
use crate::modules::contacts::model::{
    Contact, ContactFilterParams, ContactKind, ContactListResponse, CreateContactDto,
    UpdateContactDto,
};

pub(crate) const CONTACT_SELECT: &str = r#"
    SELECT c.id, c.user_id, u.name AS user_name, u.email AS user_email, c.kind, c.role_title,
           c.subjects, c.office_hours, c.phone, c.professional_email, c.room, c.department,
           c.is_active, c.created_at, c.updated_at
    FROM contacts c
    JOIN users u ON u.id = c.user_id
"#;

pub fn group_by_kind(contacts: &[Contact]) -> BTreeMap<ContactKind, Vec<Contact>> {
    let mut grouped: BTreeMap<ContactKind, Vec<Contact>> = BTreeMap::new();
    for contact in contacts {
        grouped.entry(contact.kind).or_default().push(contact.clone());
    }
    grouped
}

pub struct ContactService;

impl ContactService {
    #[instrument(skip(db))]
    pub async fn find_by_id(db: &PgPool, id: ContactId) -> Result<Contact, AppError> {
        sqlx::query_as::<_, Contact>(&format!("{} WHERE c.id = $1", CONTACT_SELECT))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Contact not found")))
    }

    #[instrument(skip(db))]
    pub async fn list_contacts(
        db: &PgPool,
        filters: ContactFilterParams,
    ) -> Result<ContactListResponse, AppError> {
        let list = sqlx::query_as::<_, Contact>(&format!(
            r#"{} WHERE c.is_active
                 AND ($1::contact_kind IS NULL OR c.kind = $1)
                 AND ($2::text IS NULL OR $2 = ANY(c.subjects))
                 AND ($3::text IS NULL OR c.role_title ILIKE '%' || $3 || '%')
               ORDER BY c.kind, u.name"#,
            CONTACT_SELECT
        ))
        .bind(filters.kind)
        .bind(filters.subject)
        .bind(filters.role_title)
        .fetch_all(db)
        .await?;

        Ok(ContactListResponse {
            total: list.len(),
            grouped: group_by_kind(&list),
            list,
        })
    }

    /// Every active contact; ranking happens in memory.
    pub async fn active_contacts(db: &PgPool) -> Result<Vec<Contact>, AppError> {
        let contacts = sqlx::query_as::<_, Contact>(&format!(
            "{} WHERE c.is_active ORDER BY u.name",
            CONTACT_SELECT
        ))
        .fetch_all(db)
        .await?;

        Ok(contacts)
    }

    #[instrument(skip(db, dto), fields(user_id = %dto.user_id))]
    pub async fn create_contact(db: &PgPool, dto: CreateContactDto) -> Result<Contact, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND is_active)",
        )
        .bind(dto.user_id)
        .fetch_one(db)
        .await?;

        if !exists {
            return Err(AppError::not_found(anyhow!("User not found")));
        }

        let id = sqlx::query_scalar::<_, ContactId>(
            r#"INSERT INTO contacts (user_id, kind, role_title, subjects, office_hours, phone,
                                     professional_email, room, department)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING id"#,
        )
        .bind(dto.user_id)
        .bind(dto.kind)
        .bind(dto.role_title.trim())
        .bind(&dto.subjects)
        .bind(Json(&dto.office_hours))
        .bind(&dto.phone)
        .bind(&dto.professional_email)
        .bind(&dto.room)
        .bind(&dto.department)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::conflict(anyhow!("This user already has a contact card"));
                }
            }
            AppError::from(e)
        })?;

        Self::find_by_id(db, id).await
    }

    /// Managers may edit any contact; other users only their own card.
    #[instrument(skip(db, dto))]
    pub async fn update_contact(
        db: &PgPool,
        caller: Caller,
        id: ContactId,
        dto: UpdateContactDto,
    ) -> Result<Contact, AppError> {
        let contact = Self::find_by_id(db, id).await?;
        if caller.role != UserRole::Manager && contact.user_id != caller.id {
            return Err(AppError::forbidden(
                "Only a manager or the contact's own user may edit it",
            ));
        }

        sqlx::query(
            r#"UPDATE contacts
               SET kind = COALESCE($2, kind),
                   role_title = COALESCE($3, role_title),
                   subjects = COALESCE($4, subjects),
                   office_hours = COALESCE($5, office_hours),
                   phone = COALESCE($6, phone),
                   professional_email = COALESCE($7, professional_email),
                   room = COALESCE($8, room),
                   department = COALESCE($9, department),
                   is_active = COALESCE($10, is_active),
                   updated_at = NOW()
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(dto.kind)
        .bind(dto.role_title.as_deref().map(str::trim))
        .bind(&dto.subjects)
        .bind(dto.office_hours.as_ref().map(Json))
        .bind(&dto.phone)
        .bind(&dto.professional_email)
        .bind(&dto.room)
        .bind(&dto.department)
        .bind(dto.is_active)
        .execute(db)
        .await?;

        Self::find_by_id(db, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use escola_models::UserId;

    fn contact(name: &str, kind: ContactKind) -> Contact {
        Contact {
            id: ContactId::new(),
            user_id: UserId::new(),
            user_name: name.to_string(),
            user_email: "contato@escola.test".to_string(),
            kind,
            role_title: "Secretária".to_string(),
            subjects: vec![],
            office_hours: Json(vec![]),
            phone: None,
            professional_email: None,
            room: None,
            department: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_group_by_kind_keeps_order_within_group() {
        let contacts = vec![
            contact("Ana", ContactKind::Secretariat),
            contact("Bruno", ContactKind::Teacher),
            contact("Célia", ContactKind::Secretariat),
        ];
        let grouped = group_by_kind(&contacts);

        assert_eq!(grouped.len(), 2);
        let names: Vec<&str> = grouped[&ContactKind::Secretariat]
            .iter()
            .map(|c| c.user_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ana", "Célia"]);
    }
}
