use crate::error::{Result, SsrfError};
use crate::settings::{config_dir, load_settings, save_settings, validate_api_url};

pub fn show(effective_url: &str) -> Result<()> {
    let settings = load_settings();
    println!("Config dir:  {}", config_dir().display());
    println!("API url:     {}", settings.api_url);
    if effective_url != settings.api_url {
        println!("  (overridden for this run: {effective_url})");
    }
    println!("Currency:    {}", settings.default_currency);
    Ok(())
}

pub fn set_url(url: &str) -> Result<()> {
    let mut settings = load_settings();
    settings.api_url = validate_api_url(url)?;
    save_settings(&settings)?;
    println!("API url set to {}", settings.api_url);
    Ok(())
}

pub fn set_currency(code: &str) -> Result<()> {
    let code = code.trim().to_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SsrfError::Settings(format!(
            "currency must be a three-letter code (got '{code}')"
        )));
    }
    let mut settings = load_settings();
    settings.default_currency = code;
    save_settings(&settings)?;
    println!("Default currency set to {}", settings.default_currency);
    Ok(())
}
