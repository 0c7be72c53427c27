use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(
    bluemoon_home: Option<PathBuf>,
    home_dir: Option<PathBuf>,
) -> Option<PathBuf> {
    match (bluemoon_home, home_dir) {
        (Some(base), _) => Some(base.join(".env")),
        (None, Some(home)) => Some(home.join(".bluemoon").join(".env")),
        (None, None) => None,
    }
}

pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("BLUEMOON_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}

#[cfg(test)]
mod tests {
    use super::fallback_dotenv_path;
    use std::path::PathBuf;

    #[test]
    fn fallback_prefers_bluemoon_home() {
        let got = fallback_dotenv_path(
            Some(PathBuf::from("/data/moon")),
            Some(PathBuf::from("/home/alice")),
        );
        assert_eq!(got, Some(PathBuf::from("/data/moon/.env")));
    }

    #[test]
    fn fallback_uses_dot_dir_in_home_when_unset() {
        let got = fallback_dotenv_path(None, Some(PathBuf::from("/home/alice")));
        assert_eq!(got, Some(PathBuf::from("/home/alice/.bluemoon/.env")));
    }
}
