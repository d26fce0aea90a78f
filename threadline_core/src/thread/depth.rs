use crate::error::ThreadError;

/// Deepest depth a reply may sit at. Depth 0 is a direct reply to the post,
/// so this allows six nesting levels.
pub const MAX_REPLY_DEPTH: i32 = 5;

/// Depth a new reply gets under `parent_depth` (`None` when replying to the
/// post itself).
pub fn child_depth(parent_depth: Option<i32>) -> Result<i32, ThreadError> {
    let depth = match parent_depth {
        None => 0,
        Some(parent) => parent + 1,
    };

    if depth > MAX_REPLY_DEPTH {
        return Err(ThreadError::DepthExceeded {
            depth,
            max: MAX_REPLY_DEPTH,
        });
    }

    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn top_level_reply_has_depth_zero() {
        assert_eq!(child_depth(None).unwrap(), 0);
    }

    #[test]
    fn nested_reply_is_one_deeper_than_parent() {
        for parent in 0..MAX_REPLY_DEPTH {
            assert_eq!(child_depth(Some(parent)).unwrap(), parent + 1);
        }
    }

    #[test]
    fn sixth_level_is_the_limit() {
        assert_eq!(child_depth(Some(4)).unwrap(), 5);

        let err = child_depth(Some(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DepthExceeded);
        assert!(matches!(err, ThreadError::DepthExceeded { depth: 6, max: 5 }));
    }
}
