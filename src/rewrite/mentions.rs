//! User mention pass.

use tracing::{debug, warn};

use super::Rewriter;
use crate::error::RelinkError;

impl Rewriter<'_> {
    /// ```text
    /// before: thanks @birkenfeld
    /// after:  thanks [@birkenfeld](https://bitbucket.org/birkenfeld)
    /// ```
    ///
    /// Only usernames confirmed by the user directory are linked; without a
    /// directory the text is returned unchanged. Tokens preceded by an
    /// identifier character, `.`, `@`, `/` or `[` (e-mail addresses, paths,
    /// already-linked mentions) are not mentions.
    pub fn convert_mentions(&self, text: &str) -> Result<String, RelinkError> {
        let Some(users) = &self.users else {
            return Ok(text.to_string());
        };
        let root = self.ctx.old_host_root();

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.patterns.mention.captures_iter(text) {
            let Some(name) = caps.get(1) else { continue };
            let username = name.as_str();
            if self.is_denylisted(username) {
                debug!(user = %username, "Skipping denylisted @token");
                continue;
            }
            if !users.is_verified(username)? {
                warn!(user = %username, "@token is not an account on the old host, left as-is");
                continue;
            }
            // the '@' sits right before the captured name
            let at = name.start() - 1;
            out.push_str(&text[last..at]);
            out.push_str(&format!("[@{}]({}/{})", username, root, username));
            last = name.end();
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn is_denylisted(&self, username: &str) -> bool {
        self.denylist.iter().any(|d| d.eq_ignore_ascii_case(username))
    }
}
