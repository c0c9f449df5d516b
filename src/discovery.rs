use std::env;
use std::path::PathBuf;

pub(crate) const LIBRARY_PATH_ENV: &str = "MECAB_LIBRARY_PATH";
pub(crate) const DICDIR_ENV: &str = "MECAB_DICDIR";
pub(crate) const USERDIC_ENV: &str = "MECAB_USERDIC";

/// Bare names and well-known paths handed to the platform loader as-is.
pub(crate) fn default_library_candidates() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["libmecab.dll", "mecab.dll"]
    }
    #[cfg(target_os = "macos")]
    {
        &[
            "libmecab.dylib",
            "libmecab.2.dylib",
            "/usr/local/lib/libmecab.dylib",
            "/opt/homebrew/lib/libmecab.dylib",
            "@rpath/libmecab.dylib",
        ]
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        &[
            "libmecab.so.2",
            "libmecab.so",
            "/usr/local/lib/libmecab.so",
            "/usr/lib/x86_64-linux-gnu/libmecab.so.2",
            "/usr/lib/aarch64-linux-gnu/libmecab.so.2",
        ]
    }
}

pub(crate) fn discover_default_library_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(LIBRARY_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    #[cfg(target_os = "windows")]
    {
        let well_known = [
            PathBuf::from("C:\\Program Files\\MeCab\\bin\\libmecab.dll"),
            PathBuf::from("C:\\Program Files (x86)\\MeCab\\bin\\libmecab.dll"),
        ];
        for path in well_known {
            if path.exists() {
                return Some(path);
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Some(home) = env::var_os("HOME") {
            #[cfg(target_os = "macos")]
            let file_name = "libmecab.dylib";
            #[cfg(all(unix, not(target_os = "macos")))]
            let file_name = "libmecab.so";

            let path = PathBuf::from(home).join(".local").join("lib").join(file_name);
            if path.exists() {
                return Some(path);
            }
        }
    }

    None
}

pub(crate) fn discover_default_dicdir() -> Option<PathBuf> {
    if let Some(path) = env::var_os(DICDIR_ENV) {
        return Some(PathBuf::from(path));
    }

    #[cfg(target_os = "windows")]
    let candidates: &[&str] = &[
        "C:\\Program Files\\MeCab\\dic\\ipadic",
        "C:\\Program Files (x86)\\MeCab\\dic\\ipadic",
    ];

    #[cfg(target_os = "macos")]
    let candidates: &[&str] = &[
        "~/.local/lib/mecab/dic/ipadic",
        "/opt/homebrew/lib/mecab/dic/ipadic",
        "/usr/local/lib/mecab/dic/ipadic",
    ];

    #[cfg(all(unix, not(target_os = "macos")))]
    let candidates: &[&str] = &[
        "~/.local/lib/mecab/dic/ipadic",
        "/var/lib/mecab/dic/debian",
        "/usr/lib/x86_64-linux-gnu/mecab/dic/ipadic",
        "/usr/lib/aarch64-linux-gnu/mecab/dic/ipadic",
        "/usr/local/lib/mecab/dic/ipadic",
        "/usr/lib/mecab/dic/ipadic",
    ];

    for candidate in candidates {
        let path = if let Some(stripped) = candidate.strip_prefix("~/") {
            match env::var_os("HOME") {
                Some(home) => PathBuf::from(home).join(stripped),
                None => continue,
            }
        } else {
            PathBuf::from(candidate)
        };
        if path.exists() {
            return Some(path);
        }
    }

    None
}

pub(crate) fn discover_user_dictionary() -> Option<PathBuf> {
    env::var_os(USERDIC_ENV).map(PathBuf::from)
}

#[cfg(test)]
mod discovery_tests {
    use super::{
        default_library_candidates, discover_default_dicdir, discover_default_library_path,
        discover_user_dictionary,
    };
    use crate::test_support::{make_temp_dir, remove_tree, with_env_vars};
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn default_library_candidates_match_platform() {
        let candidates = default_library_candidates();
        assert!(!candidates.is_empty());

        #[cfg(target_os = "windows")]
        assert!(candidates
            .iter()
            .all(|candidate| candidate.ends_with(".dll")));
        #[cfg(target_os = "macos")]
        assert!(candidates
            .iter()
            .any(|candidate| candidate.ends_with(".dylib")));
        #[cfg(all(unix, not(target_os = "macos")))]
        assert!(candidates
            .iter()
            .any(|candidate| candidate.contains(".so")));
    }

    #[test]
    fn library_path_prefers_env_var() {
        with_env_vars(
            &[
                ("MECAB_LIBRARY_PATH", Some("/tmp/mecab-rs-lib-from-env.so")),
                ("HOME", None),
            ],
            || {
                assert_eq!(
                    discover_default_library_path(),
                    Some(PathBuf::from("/tmp/mecab-rs-lib-from-env.so"))
                );
            },
        );
    }

    #[test]
    fn dicdir_prefers_env_var() {
        with_env_vars(
            &[
                ("MECAB_DICDIR", Some("/tmp/mecab-rs-dic-from-env")),
                ("HOME", None),
            ],
            || {
                assert_eq!(
                    discover_default_dicdir(),
                    Some(PathBuf::from("/tmp/mecab-rs-dic-from-env"))
                );
            },
        );
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn dicdir_expands_home_candidate() {
        let home = make_temp_dir("discover-dicdir-home");
        let dicdir = home
            .join(".local")
            .join("lib")
            .join("mecab")
            .join("dic")
            .join("ipadic");
        fs::create_dir_all(&dicdir).expect("failed to prepare dicdir");

        with_env_vars(
            &[
                ("MECAB_DICDIR", None),
                ("HOME", Some(home.to_str().expect("utf-8 temp path"))),
            ],
            || {
                assert_eq!(discover_default_dicdir(), Some(dicdir.clone()));
            },
        );

        remove_tree(&home);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn library_path_finds_home_local_library() {
        let home = make_temp_dir("discover-lib-home");
        #[cfg(target_os = "macos")]
        let file_name = "libmecab.dylib";
        #[cfg(all(unix, not(target_os = "macos")))]
        let file_name = "libmecab.so";
        let library = home.join(".local").join("lib").join(file_name);

        fs::create_dir_all(
            library
                .parent()
                .expect("library path must always include a parent"),
        )
        .expect("failed to create library parent dir");
        fs::write(&library, b"").expect("failed to create fake library");

        with_env_vars(
            &[
                ("MECAB_LIBRARY_PATH", None),
                ("HOME", Some(home.to_str().expect("utf-8 temp path"))),
            ],
            || {
                assert_eq!(discover_default_library_path(), Some(library.clone()));
            },
        );

        remove_tree(&home);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn library_path_is_none_without_env_or_local_copy() {
        let home = make_temp_dir("discover-lib-none");
        with_env_vars(
            &[
                ("MECAB_LIBRARY_PATH", None),
                ("HOME", Some(home.to_str().expect("utf-8 temp path"))),
            ],
            || {
                assert!(discover_default_library_path().is_none());
            },
        );
        remove_tree(&home);
    }

    #[test]
    fn user_dictionary_comes_only_from_env() {
        with_env_vars(&[("MECAB_USERDIC", None)], || {
            assert!(discover_user_dictionary().is_none());
        });
        with_env_vars(&[("MECAB_USERDIC", Some("/tmp/user.dic"))], || {
            assert_eq!(
                discover_user_dictionary(),
                Some(PathBuf::from("/tmp/user.dic"))
            );
        });
    }
}
