use trojan_prober::probe::ProbeDefinition;

fn def(base: &str, repeat: &str, n: usize) -> ProbeDefinition {
    ProbeDefinition {
        alpn: "http/1.1".into(),
        base_content: base.into(),
        repeat_content: repeat.into(),
        repeat_num: n,
    }
}

#[test]
fn payload_equals_decoded_base_plus_repeated_decoded_tail() {
    let payload = def(r"GET / HTTP/1.1\r\nHost: x\r\n\r\n", "A", 5).build_payload();
    assert_eq!(payload, b"GET / HTTP/1.1\r\nHost: x\r\n\r\nAAAAA");
}

#[test]
fn zero_repeat_num_yields_just_the_base_content() {
    let payload = def(r"BASE\r\n", "tail", 0).build_payload();
    assert_eq!(payload, b"BASE\r\n");
}

#[test]
fn crlf_escapes_in_both_base_and_repeat_are_decoded() {
    let payload = def(r"\r\n", r"\r\n", 3).build_payload();
    assert_eq!(payload, b"\r\n\r\n\r\n\r\n");
}
