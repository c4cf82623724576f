use argon2::password_hash::{rand_core::OsRng, Error, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHasher};
use rand::distr::{Alphanumeric, SampleString};

/// Length of the temporary credential handed to a freshly registered
/// lower authority. Long enough to resist online guessing until the
/// authority completes their profile and picks their own password.
pub const TEMP_PASSWORD_LENGTH: usize = 12;

pub fn hash_password(password: &str) -> Result<String, Error> {
    #[cfg(test)]
    if password == "\0" {
        return Err(password_hash::Error::Password);
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn generate_temp_password() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), TEMP_PASSWORD_LENGTH)
}
