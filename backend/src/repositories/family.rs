//! Family, membership and baby repository

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Family record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FamilyRecord {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A family together with the caller's role in it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MembershipRecord {
    pub id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Baby record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BabyRecord {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a baby
#[derive(Debug, Clone)]
pub struct CreateBaby {
    pub family_id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: String,
}

/// Family repository for database operations
pub struct FamilyRepository;

impl FamilyRepository {
    /// Create a family and register the creator as its owner
    pub async fn create_with_owner(
        pool: &PgPool,
        name: &str,
        invite_code: &str,
        owner_id: Uuid,
    ) -> Result<FamilyRecord> {
        let mut tx = pool.begin().await?;

        let family = sqlx::query_as::<_, FamilyRecord>(
            r#"
            INSERT INTO families (name, invite_code, created_by)
            VALUES ($1, $2, $3)
            RETURNING id, name, invite_code, created_by, created_at
            "#,
        )
        .bind(name)
        .bind(invite_code)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO family_members (family_id, user_id, role)
            VALUES ($1, $2, 'owner')
            "#,
        )
        .bind(family.id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(family)
    }

    pub async fn find_by_invite_code(pool: &PgPool, invite_code: &str) -> Result<Option<FamilyRecord>> {
        let family = sqlx::query_as::<_, FamilyRecord>(
            r#"
            SELECT id, name, invite_code, created_by, created_at
            FROM families
            WHERE invite_code = $1
            "#,
        )
        .bind(invite_code)
        .fetch_optional(pool)
        .await?;

        Ok(family)
    }

    /// Add a member; joining twice is a no-op
    pub async fn add_member(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO family_members (family_id, user_id, role)
            VALUES ($1, $2, 'member')
            ON CONFLICT (family_id, user_id) DO NOTHING
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Families the user belongs to, newest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<MembershipRecord>> {
        let families = sqlx::query_as::<_, MembershipRecord>(
            r#"
            SELECT f.id, f.name, f.invite_code, m.role, f.created_at
            FROM families f
            JOIN family_members m ON m.family_id = f.id
            WHERE m.user_id = $1
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(families)
    }

    pub async fn find_membership(
        pool: &PgPool,
        family_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<MembershipRecord>> {
        let membership = sqlx::query_as::<_, MembershipRecord>(
            r#"
            SELECT f.id, f.name, f.invite_code, m.role, f.created_at
            FROM families f
            JOIN family_members m ON m.family_id = f.id
            WHERE f.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    pub async fn is_member(pool: &PgPool, family_id: Uuid, user_id: Uuid) -> Result<bool> {
        let member = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM family_members WHERE family_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(family_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(member)
    }
}

/// Baby repository for database operations
pub struct BabyRepository;

impl BabyRepository {
    pub async fn create(pool: &PgPool, input: CreateBaby) -> Result<BabyRecord> {
        let baby = sqlx::query_as::<_, BabyRecord>(
            r#"
            INSERT INTO babies (family_id, name, birth_date, gender)
            VALUES ($1, $2, $3, $4)
            RETURNING id, family_id, name, birth_date, gender, created_at
            "#,
        )
        .bind(input.family_id)
        .bind(&input.name)
        .bind(input.birth_date)
        .bind(&input.gender)
        .fetch_one(pool)
        .await?;

        Ok(baby)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<BabyRecord>> {
        let baby = sqlx::query_as::<_, BabyRecord>(
            r#"
            SELECT id, family_id, name, birth_date, gender, created_at
            FROM babies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(baby)
    }

    pub async fn list_for_family(pool: &PgPool, family_id: Uuid) -> Result<Vec<BabyRecord>> {
        let babies = sqlx::query_as::<_, BabyRecord>(
            r#"
            SELECT id, family_id, name, birth_date, gender, created_at
            FROM babies
            WHERE family_id = $1
            ORDER BY birth_date DESC
            "#,
        )
        .bind(family_id)
        .fetch_all(pool)
        .await?;

        Ok(babies)
    }
}
