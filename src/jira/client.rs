use reqwest::blocking::{Client, RequestBuilder};
use snafu::prelude::*;

/// Connection details shared by every Jira call.
#[derive(Debug, Clone)]
pub struct JiraConnection {
    pub instance_url: String,
    pub project: String,
    pub user: String,
    pub password: String,
    pub board: Option<u64>,
}

impl JiraConnection {
    /// Parses the optional board id; an empty value means no board.
    pub fn parse_board(board: Option<&str>) -> Result<Option<u64>, JiraError> {
        match board.map(str::trim) {
            None | Some("") => Ok(None),
            Some(board) => board
                .parse()
                .map(Some)
                .ok()
                .context(InvalidBoardSnafu { board }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct JiraClient {
    http: Client,
    base_url: String,
    user: String,
    password: String,
}

impl JiraClient {
    pub fn new(connection: &JiraConnection) -> Result<Self, JiraError> {
        let http = Client::builder().build().context(ClientSnafu)?;
        Ok(Self {
            http,
            base_url: connection.instance_url.trim_end_matches('/').to_string(),
            user: connection.user.clone(),
            password: connection.password.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.get(self.url(path)))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authorized(self.http.post(self.url(path)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user, Some(&self.password))
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub enum JiraError {
    #[snafu(display("Board must be an integer, got '{}'", board))]
    InvalidBoard { board: String },
    #[snafu(display("Failed to build the HTTP client"))]
    ClientError { source: reqwest::Error },
    #[snafu(display("Failed to create the issue"))]
    CreateIssueError { source: crate::ext::HttpError },
    #[snafu(display("Failed to list the sprints of board {}", board))]
    ListSprintsError {
        board: u64,
        source: crate::ext::HttpError,
    },
    #[snafu(display("No active sprint found on board {}", board))]
    NoActiveSprint { board: u64 },
    #[snafu(display("Failed to move {} into sprint {}", issue, sprint))]
    MoveToSprintError {
        issue: String,
        sprint: u64,
        source: crate::ext::HttpError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("42"), Some(42))]
    #[case(Some(" 7 "), Some(7))]
    fn parses_optional_boards(#[case] input: Option<&str>, #[case] expected: Option<u64>) {
        assert_eq!(JiraConnection::parse_board(input).unwrap(), expected);
    }

    #[test]
    fn non_numeric_board_is_rejected() {
        assert!(matches!(
            JiraConnection::parse_board(Some("scrum")),
            Err(JiraError::InvalidBoard { board }) if board == "scrum"
        ));
    }
}
