use crate::error::AppError;
use crate::spotify::client::SpotifyClient;
use crate::spotify::models::PlaylistSummary;

/// Page size used when walking the current user's playlists.
pub const PLAYLIST_PAGE_SIZE: usize = 50;

/// Find the first of the current user's playlists matching both predicates.
///
/// Pages through `GET /v1/me/playlists` fifty at a time, scanning each page in
/// the order Spotify returns it, and stops at the first empty page. Nothing is
/// cached between calls.
///
/// # Arguments
/// * `client` - Spotify client
/// * `access_token` - Access token of the user whose playlists are searched
/// * `owner_matches` - Predicate on the playlist owner's id
/// * `name_matches` - Predicate on the playlist name
///
/// # Returns
/// The matching playlist, or None once the listing is exhausted
///
/// # Errors
/// Propagates any API error from a page fetch
pub async fn find_playlist<O, N>(
    client: &SpotifyClient,
    access_token: &str,
    owner_matches: O,
    name_matches: N,
) -> Result<Option<PlaylistSummary>, AppError>
where
    O: Fn(&str) -> bool,
    N: Fn(&str) -> bool,
{
    let mut offset = 0;

    loop {
        let page = client
            .user_playlists(access_token, PLAYLIST_PAGE_SIZE, offset)
            .await?;

        if page.items.is_empty() {
            tracing::debug!(offset = offset, "Playlist listing exhausted without a match");
            return Ok(None);
        }

        if let Some(found) = page
            .items
            .into_iter()
            .flatten()
            .find(|playlist| owner_matches(&playlist.owner.id) && name_matches(&playlist.name))
        {
            tracing::debug!(
                playlist_id = %found.id,
                offset = offset,
                "Found matching playlist"
            );
            return Ok(Some(found));
        }

        offset += PLAYLIST_PAGE_SIZE;
    }
}
