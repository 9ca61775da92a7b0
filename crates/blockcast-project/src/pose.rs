//! Observer pose and parsing of bracketed numeric lists from console replies.
//!
//! Replies look like `Steve has the following entity data: [12.5d, 64.0d, -3.0d]`.
//! Type suffixes and other stray characters around each number are dropped.

use glam::DVec3;

use crate::error::{ProjectError, ProjectResult};

/// Where the observer stands and where they look.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverPose {
    /// Feet position.
    pub position: DVec3,
    /// Yaw in degrees.
    pub yaw: f64,
    /// Pitch in degrees; positive looks down.
    pub pitch: f64,
}

impl ObserverPose {
    #[must_use]
    pub fn new(position: DVec3, yaw: f64, pitch: f64) -> Self {
        Self {
            position,
            yaw,
            pitch,
        }
    }

    /// Build a pose from the position and rotation replies.
    ///
    /// The position list must hold exactly three values; the rotation list
    /// must start with yaw and pitch.
    pub fn from_responses(position_reply: &str, rotation_reply: &str) -> ProjectResult<Self> {
        let position = parse_list_response(position_reply)?;
        let [x, y, z] = position[..] else {
            return Err(ProjectError::pose_parse(format!(
                "expected 3 position values, found {}",
                position.len()
            )));
        };

        let rotation = parse_list_response(rotation_reply)?;
        let [yaw, pitch, ..] = rotation[..] else {
            return Err(ProjectError::pose_parse(format!(
                "expected yaw and pitch, found {} rotation values",
                rotation.len()
            )));
        };

        Ok(Self::new(DVec3::new(x, y, z), yaw, pitch))
    }

    /// Parse `x,y,z,yaw,pitch`.
    pub fn from_csv(text: &str) -> ProjectResult<Self> {
        let values = parse_tokens(text)?;
        let [x, y, z, yaw, pitch] = values[..] else {
            return Err(ProjectError::pose_parse(format!(
                "expected x,y,z,yaw,pitch, found {} values",
                values.len()
            )));
        };
        Ok(Self::new(DVec3::new(x, y, z), yaw, pitch))
    }
}

/// Extract the first bracketed, comma-separated list of numbers in `reply`.
pub fn parse_list_response(reply: &str) -> ProjectResult<Vec<f64>> {
    let open = reply
        .find('[')
        .ok_or_else(|| ProjectError::pose_parse(format!("no bracketed list in {reply:?}")))?;
    let rest = &reply[open + 1..];
    let close = rest
        .find(']')
        .ok_or_else(|| ProjectError::pose_parse(format!("unterminated list in {reply:?}")))?;
    let body = &rest[..close];
    if body.is_empty() {
        return Err(ProjectError::pose_parse(format!("empty list in {reply:?}")));
    }
    parse_tokens(body)
}

fn parse_tokens(body: &str) -> ProjectResult<Vec<f64>> {
    body.split(',').map(parse_token).collect()
}

fn parse_token(token: &str) -> ProjectResult<f64> {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect();
    cleaned
        .parse()
        .map_err(|_| ProjectError::pose_parse(format!("not a number: {:?}", token.trim())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entity_position() {
        let values =
            parse_list_response("Steve has the following entity data: [123.0d, 64.0d, -12.0d]")
                .unwrap();
        assert_eq!(values, [123.0, 64.0, -12.0]);
    }

    #[test]
    fn parses_plain_list() {
        assert_eq!(
            parse_list_response("[123.0, 64.0, -12.0]").unwrap(),
            [123.0, 64.0, -12.0]
        );
        assert_eq!(parse_list_response("[1e2f]").unwrap(), [100.0]);
    }

    #[test]
    fn missing_brackets_fail() {
        assert!(matches!(
            parse_list_response("No entity was found"),
            Err(ProjectError::PoseParse(_))
        ));
        assert!(matches!(
            parse_list_response("[1.0, 2.0"),
            Err(ProjectError::PoseParse(_))
        ));
        assert!(matches!(
            parse_list_response("[]"),
            Err(ProjectError::PoseParse(_))
        ));
    }

    #[test]
    fn malformed_token_fails() {
        assert!(matches!(
            parse_list_response("[1.0, abc, 3.0]"),
            Err(ProjectError::PoseParse(_))
        ));
        assert!(matches!(
            parse_list_response("[1.0, 2.0.0]"),
            Err(ProjectError::PoseParse(_))
        ));
    }

    #[test]
    fn pose_from_replies() {
        let pose = ObserverPose::from_responses(
            "Alex has the following entity data: [0.5d, 64.0d, -10.25d]",
            "Alex has the following entity data: [-90.0f, 15.5f]",
        )
        .unwrap();
        assert_eq!(pose.position, DVec3::new(0.5, 64.0, -10.25));
        assert!((pose.yaw + 90.0).abs() < f64::EPSILON);
        assert!((pose.pitch - 15.5).abs() < f64::EPSILON);
    }

    #[test]
    fn pose_needs_three_coordinates() {
        assert!(matches!(
            ObserverPose::from_responses("[1.0, 2.0]", "[0.0, 0.0]"),
            Err(ProjectError::PoseParse(_))
        ));
        assert!(matches!(
            ObserverPose::from_responses("[1.0, 2.0, 3.0]", "[0.0]"),
            Err(ProjectError::PoseParse(_))
        ));
    }

    #[test]
    fn pose_from_csv() {
        let pose = ObserverPose::from_csv("0, 64, 0, 0, 0").unwrap();
        assert_eq!(pose.position, DVec3::new(0.0, 64.0, 0.0));
        assert!(ObserverPose::from_csv("0,64,0").is_err());
    }
}
