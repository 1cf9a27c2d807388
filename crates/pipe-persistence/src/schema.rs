//! Esquema Diesel (mantenido a mano junto a `migrations/`).

diesel::table! {
    executions (id) {
        id -> BigInt,
        run_id -> Text,
        component -> Text,
        pipeline_name -> Text,
        pipeline_root -> Text,
        cache_key -> Text,
        caching -> Text,
        state -> Text,
        cached_from -> Nullable<BigInt>,
        error -> Nullable<Text>,
        started_at -> Text,
        finished_at -> Nullable<Text>,
    }
}

diesel::table! {
    artifacts (id) {
        id -> BigInt,
        type_name -> Text,
        uri -> Text,
        fingerprint -> Text,
        properties -> Text,
        payload -> Text,
        producer_execution -> Nullable<BigInt>,
        created_at -> Text,
    }
}

diesel::table! {
    events (id) {
        id -> BigInt,
        execution_id -> BigInt,
        artifact_id -> BigInt,
        direction -> Text,
        channel -> Text,
        position -> Integer,
    }
}

diesel::joinable!(events -> executions (execution_id));
diesel::joinable!(events -> artifacts (artifact_id));

diesel::allow_tables_to_appear_in_same_query!(executions, artifacts, events);
