pub mod delta;
pub mod encode;
pub mod separator;
pub mod translate;
pub mod upstream;

use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::{BoxStream, unfold};
use rekagate_protocol::stream::{LineDecoder, UpstreamLine, classify_line};
use tracing::info;

use crate::error::{GatewayError, GatewayResult};
use self::delta::DeltaReconstructor;

pub type EventStream = BoxStream<'static, GatewayResult<Bytes>>;

/// Turns the upstream snapshot stream into outbound SSE frames. Frames
/// for each upstream chunk are queued and drained one at a time; the
/// terminal sentinel closes the stream even if upstream keeps talking.
pub fn relay(response: wreq::Response, model: String) -> EventStream {
    let upstream = response.bytes_stream().boxed();

    unfold(
        (
            upstream,
            LineDecoder::new(),
            DeltaReconstructor::new(),
            VecDeque::<Bytes>::new(),
            model,
            false,
        ),
        |(mut upstream, mut decoder, mut reconstructor, mut pending, model, mut done)| async move {
            loop {
                if let Some(frame) = pending.pop_front() {
                    return Some((
                        Ok(frame),
                        (upstream, decoder, reconstructor, pending, model, done),
                    ));
                }
                if done {
                    return None;
                }

                match upstream.next().await {
                    Some(Ok(chunk)) => {
                        for line in decoder.push_bytes(&chunk) {
                            match handle_line(&line, &mut reconstructor, &mut pending, &model) {
                                Ok(finished) => {
                                    if finished {
                                        done = true;
                                        break;
                                    }
                                }
                                Err(err) => {
                                    done = true;
                                    return Some((
                                        Err(err),
                                        (upstream, decoder, reconstructor, pending, model, done),
                                    ));
                                }
                            }
                        }
                    }
                    Some(Err(err)) => {
                        done = true;
                        return Some((
                            Err(GatewayError::Transport(format!("upstream stream failed: {err}"))),
                            (upstream, decoder, reconstructor, pending, model, done),
                        ));
                    }
                    None => {
                        done = true;
                        if let Some(line) = decoder.finish() {
                            if let Err(err) =
                                handle_line(&line, &mut reconstructor, &mut pending, &model)
                            {
                                return Some((
                                    Err(err),
                                    (upstream, decoder, reconstructor, pending, model, done),
                                ));
                            }
                        }
                    }
                }
            }
        },
    )
    .boxed()
}

/// Returns true once the terminal sentinel has been queued.
fn handle_line(
    line: &str,
    reconstructor: &mut DeltaReconstructor,
    pending: &mut VecDeque<Bytes>,
    model: &str,
) -> GatewayResult<bool> {
    match classify_line(line) {
        UpstreamLine::Snapshot(payload) => {
            if let Some(delta) = reconstructor.apply(&payload)? {
                let terminal = delta.is_terminal();
                pending.push_back(encode::chunk_frame(&delta, model)?);
                if terminal {
                    pending.push_back(encode::done_frame());
                    return Ok(true);
                }
            }
            Ok(false)
        }
        UpstreamLine::Control | UpstreamLine::Blank => Ok(false),
        UpstreamLine::Unrecognized(raw) => {
            info!(event = "unrecognized_upstream_line", line = %raw);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(lines: &[&str]) -> (Vec<Bytes>, Option<GatewayError>) {
        let mut reconstructor = DeltaReconstructor::new();
        let mut pending = VecDeque::new();
        for line in lines {
            match handle_line(line, &mut reconstructor, &mut pending, "reka-core") {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => return (pending.into_iter().collect(), Some(err)),
            }
        }
        (pending.into_iter().collect(), None)
    }

    fn contents(frames: &[Bytes]) -> Vec<String> {
        frames
            .iter()
            .map(|frame| std::str::from_utf8(frame).unwrap().to_string())
            .collect()
    }

    #[test]
    fn snapshots_become_frames_then_sentinel() {
        let (frames, err) = drive(&[
            "event: message",
            r#"data: {"type":"model","text":"Hi"}"#,
            "",
            r#"data: {"type":"model","text":"Hi there","finish_reason":null}"#,
        ]);
        assert!(err.is_none());

        let texts = contents(&frames);
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("\"content\":\"Hi\""));
        assert!(texts[1].contains("\"content\":\" there\""));
        assert!(texts[1].contains("\"finish_reason\":\"stop\""));
        assert_eq!(texts[2], "data: [DONE]\n\n");
    }

    #[test]
    fn sentinel_is_emitted_exactly_once() {
        let (frames, _) = drive(&[
            r#"{"type":"model","text":"Hi","finish_reason":"stop"}"#,
            r#"{"type":"model","text":"Hi more","finish_reason":"stop"}"#,
        ]);
        let sentinels = contents(&frames)
            .iter()
            .filter(|frame| frame.contains("[DONE]"))
            .count();
        assert_eq!(sentinels, 1);
    }

    #[test]
    fn no_sentinel_without_finish_reason() {
        let (frames, err) = drive(&[r#"{"type":"model","text":"Hi"}"#]);
        assert!(err.is_none());
        assert!(!contents(&frames).iter().any(|frame| frame.contains("[DONE]")));
    }

    #[test]
    fn unrecognized_lines_are_skipped() {
        let (frames, err) = drive(&["ping", r#"{"type":"model","text":"Hi"}"#]);
        assert!(err.is_none());
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn decode_failure_stops_the_relay() {
        let (_, err) = drive(&["data: {broken"]);
        assert!(matches!(err, Some(GatewayError::Decode(_))));
    }
}
