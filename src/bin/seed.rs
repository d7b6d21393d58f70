use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use tourism_booking_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user_with_role(&pool, "admin@example.com", "admin123", "admin").await?;
    let agency_id = ensure_user_with_role(&pool, "agency@example.com", "agency123", "agency").await?;
    let user_id = ensure_user_with_role(&pool, "user@example.com", "user123", "user").await?;
    seed_catalog(&pool).await?;
    seed_coupons(&pool).await?;

    println!("Seed completed. Admin: {admin_id}, Agency: {agency_id}, User: {user_id}");
    Ok(())
}

async fn ensure_user_with_role(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let services = vec![
        ("Ha Long Bay Day Cruise", "Limestone karsts and kayaking", 1_450_000_i64, 1, "Ha Long"),
        ("Hoi An Old Town Walk", "Lantern-lit evening tour with dinner", 650_000, 1, "Hoi An"),
        ("Sapa Trekking", "Two-day terraced-valley trek with homestay", 2_800_000, 2, "Sapa"),
        ("Mekong Delta Sampan Trip", "Floating market and coconut workshop", 980_000, 1, "Can Tho"),
    ];

    for (name, desc, price, duration_days, location) in services {
        sqlx::query(
            r#"
            INSERT INTO services (id, name, description, price, duration_days, location)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .bind(duration_days)
        .bind(location)
        .execute(pool)
        .await?;
    }

    let combos = vec![
        ("North Vietnam Explorer", "Ha Long cruise + Sapa trek, transfers included", 3_900_000_i64),
        ("Central Heritage Pack", "Hoi An walk + Hue citadel day trip", 1_500_000),
    ];

    for (name, desc, price) in combos {
        sqlx::query(
            r#"
            INSERT INTO service_combos (id, name, description, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(desc)
        .bind(price)
        .execute(pool)
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}

async fn seed_coupons(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO coupons (id, code, description, discount_type, value, active)
        VALUES ($1, 'WELCOME10', '10% off your first tour', 'percent', 10, TRUE)
        ON CONFLICT (code) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .execute(pool)
    .await?;

    println!("Seeded coupons");
    Ok(())
}
