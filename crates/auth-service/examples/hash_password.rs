//! 生成密码哈希
//!
//! 用于手工初始化账号时生成 users.password_hash 字段的值。
//!
//! 运行: cargo run -p auth-service --example hash_password -- <password> [cost]

use auth_service::{PasswordHasher, PasswordPolicy};

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(password) = args.next() else {
        eprintln!("Usage: hash_password <password> [cost]");
        std::process::exit(2);
    };
    let cost = args.next().and_then(|c| c.parse().ok()).unwrap_or(10);

    if !PasswordPolicy::default().is_strong(&password) {
        eprintln!("Warning: password does not satisfy the default strength policy");
    }

    let hasher = match PasswordHasher::new(cost) {
        Ok(hasher) => hasher,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match hasher.hash(&password) {
        Ok(h) => {
            println!("{}", h);
            if hasher.verify(&password, &h) {
                eprintln!("  ✓ Verification passed");
            } else {
                eprintln!("  ✗ Verification failed");
            }
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
