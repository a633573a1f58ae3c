use verticut::{UploadAssembler, VerticutError};

fn fragments(n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| {
            // Distinct length and content per fragment so misordering or
            // truncation cannot cancel out.
            let mut payload = vec![i as u8; i + 1];
            payload.push(0xF0 | i as u8);
            payload
        })
        .collect()
}

fn expected_bytes(parts: &[Vec<u8>]) -> Vec<u8> {
    parts.iter().flatten().copied().collect()
}

fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn recurse(prefix: &mut Vec<usize>, rest: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if rest.is_empty() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..rest.len() {
            let v = rest.remove(i);
            prefix.push(v);
            recurse(prefix, rest, out);
            prefix.pop();
            rest.insert(i, v);
        }
    }
    let mut out = Vec::new();
    recurse(&mut Vec::new(), &mut (0..n).collect(), &mut out);
    out
}

#[test]
fn every_arrival_order_yields_index_order_bytes() {
    let parts = fragments(4);
    let expected = expected_bytes(&parts);
    let dir = tempfile::tempdir().unwrap();

    for (run, order) in permutations(4).into_iter().enumerate() {
        let assembler = UploadAssembler::new();
        let upload_id = format!("perm-{run}");
        for &idx in &order {
            assembler
                .receive_fragment(&upload_id, idx as u32, 4, "clip.bin", parts[idx].clone())
                .unwrap();
        }
        let path = assembler.try_assemble(&upload_id, dir.path()).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            expected,
            "arrival order {order:?} corrupted the stream"
        );
        std::fs::remove_file(path).unwrap();
    }
}

#[test]
fn three_fragments_arriving_2_0_1_assemble_in_order() {
    let assembler = UploadAssembler::new();
    let dir = tempfile::tempdir().unwrap();
    assembler
        .receive_fragment("s", 2, 3, "v.mp4", b"tail".to_vec())
        .unwrap();
    assembler
        .receive_fragment("s", 0, 3, "v.mp4", b"head".to_vec())
        .unwrap();
    assembler
        .receive_fragment("s", 1, 3, "v.mp4", b"mid".to_vec())
        .unwrap();

    let path = assembler.try_assemble("s", dir.path()).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"headmidtail");
}

#[test]
fn assemble_never_returns_a_partial_file() {
    let parts = fragments(5);
    let dir = tempfile::tempdir().unwrap();
    let assembler = UploadAssembler::new();

    for (i, part) in parts.iter().enumerate().take(4) {
        assembler
            .receive_fragment("u", i as u32, 5, "clip.bin", part.clone())
            .unwrap();
        let err = assembler.try_assemble("u", dir.path()).unwrap_err();
        assert!(matches!(err, VerticutError::Incomplete { .. }));
        // Nothing was written.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    assembler
        .receive_fragment("u", 4, 5, "clip.bin", parts[4].clone())
        .unwrap();
    let path = assembler.try_assemble("u", dir.path()).unwrap();
    assert_eq!(std::fs::read(path).unwrap(), expected_bytes(&parts));
}

#[test]
fn concurrent_unrelated_uploads_assemble_independently() {
    use std::sync::Arc;

    let assembler = Arc::new(UploadAssembler::new());
    let dir = tempfile::tempdir().unwrap();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let assembler = Arc::clone(&assembler);
            let dir = dir.path().to_path_buf();
            std::thread::spawn(move || {
                let id = format!("upload-{t}");
                let parts = fragments(3);
                // Reverse arrival on odd workers.
                let order: Vec<usize> = if t % 2 == 0 {
                    vec![0, 1, 2]
                } else {
                    vec![2, 1, 0]
                };
                for idx in order {
                    assembler
                        .receive_fragment(&id, idx as u32, 3, &format!("{id}.bin"), parts[idx].clone())
                        .unwrap();
                }
                let path = assembler.try_assemble(&id, &dir).unwrap();
                assert_eq!(std::fs::read(path).unwrap(), expected_bytes(&parts));
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(assembler.session_count(), 0);
}
