/// A validated GitHub repository reference in `owner/repo` format.
///
/// # Example
///
/// ```
/// use updraft_core::repo::GitHubRepo;
///
/// let repo: GitHubRepo = "electron/fiddle".parse().unwrap();
/// assert_eq!(repo.owner(), "electron");
/// assert_eq!(repo.name(), "fiddle");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitHubRepo {
    owner: String,
    name: String,
}

impl GitHubRepo {
    /// Create a new `GitHubRepo`, validating the `owner/repo` format.
    ///
    /// # Errors
    ///
    /// Returns an error string if `s` is not in `owner/repo` format or if
    /// either component is empty.
    pub fn new(s: &str) -> Result<Self, String> {
        match s.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!(
                "Invalid GitHub repo format: expected 'owner/repo', got '{s}'"
            )),
        }
    }

    /// Get the owner part.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repo name part.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for GitHubRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl std::str::FromStr for GitHubRepo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GitHubRepo {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<GitHubRepo> for String {
    fn from(repo: GitHubRepo) -> Self {
        repo.to_string()
    }
}
