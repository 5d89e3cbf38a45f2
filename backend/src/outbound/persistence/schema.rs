//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Registered accounts and their participation balance.
    user_accounts (id) {
        id -> Uuid,
        /// Lower-cased address; unique via `user_accounts_email_key`.
        email -> Varchar,
        display_name -> Varchar,
        /// `recruit`, `volunteer_recruiter`, or `admin`.
        role -> Varchar,
        /// Present only for volunteer recruiters.
        volunteer_status -> Nullable<Varchar>,
        organisation -> Nullable<Varchar>,
        email_confirmed_at -> Nullable<Timestamptz>,
        /// Always equal to the sum of the account's log entries.
        participation_count -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only participation log.
    point_activity_log (id) {
        id -> Uuid,
        user_id -> Uuid,
        points -> Int4,
        activity -> Varchar,
        description -> Nullable<Varchar>,
        /// `recruit`, `volunteer`, or `generic`.
        ledger -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Single-use token digests.
    email_tokens (digest) {
        digest -> Varchar,
        user_id -> Uuid,
        purpose -> Varchar,
        expires_at -> Timestamptz,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(point_activity_log -> user_accounts (user_id));
diesel::joinable!(email_tokens -> user_accounts (user_id));

diesel::allow_tables_to_appear_in_same_query!(user_accounts, point_activity_log, email_tokens);
