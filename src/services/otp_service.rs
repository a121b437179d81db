use rand::Rng;

pub const OTP_MIN: u32 = 1000;
pub const OTP_MAX: u32 = 9999;

/// Generate a 4-digit reset code in [1000, 9999].
pub fn generate_otp() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(OTP_MIN..=OTP_MAX).to_string()
}
